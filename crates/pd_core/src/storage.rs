use async_trait::async_trait;
use crate::types::{SavedSession, SessionSummary};
use crate::Result;

#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Persist a session, replacing any previous one with the same id
    async fn save(&self, session: &SavedSession) -> Result<()>;

    /// Summaries of every stored session, newest first
    async fn list(&self) -> Result<Vec<SessionSummary>>;

    /// Fetch one session, `Error::NotFound` when missing
    async fn get(&self, id: &str) -> Result<SavedSession>;

    /// Remove one session, `Error::NotFound` when missing
    async fn delete(&self, id: &str) -> Result<()>;
}
