use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use pd_core::{Error, Result, SavedSession, SessionStorage, SessionSummary, SESSION_NOT_FOUND};
use crate::check_id;

/// Sessions kept for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    sessions: Arc<RwLock<HashMap<String, SavedSession>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn save(&self, session: &SavedSession) -> Result<()> {
        check_id(&session.id)?;
        self.sessions.write().await.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries: Vec<SessionSummary> =
            self.sessions.read().await.values().map(SavedSession::summary).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn get(&self, id: &str) -> Result<SavedSession> {
        check_id(id)?;
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(SESSION_NOT_FOUND.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        check_id(id)?;
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(SESSION_NOT_FOUND.to_string()))
    }
}
