use std::path::{Path, PathBuf};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use pd_core::{Error, Result, SavedSession, SessionStorage, SessionSummary, SESSION_NOT_FOUND};
use crate::check_id;

/// One pretty-printed `{id}.json` per session under a single directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await.map_err(|e| {
            Error::Storage(format!("Failed to create data directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        check_id(id)?;
        Ok(self.dir.join(format!("{}.json", id)))
    }

    async fn read_session(path: &Path) -> Result<SavedSession> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| Error::FileRead(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| Error::FileRead(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn save(&self, session: &SavedSession) -> Result<()> {
        let path = self.path_for(&session.id)?;
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(session)?;

        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Saved session {} to {}", session.id, path.display());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::FileRead(format!("{}: {}", self.dir.display(), e))),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_session(&path).await {
                Ok(session) => summaries.push(session.summary()),
                Err(e) => warn!("Skipping unreadable session file {}: {}", path.display(), e),
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn get(&self, id: &str) -> Result<SavedSession> {
        let path = self.path_for(id)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::NotFound(SESSION_NOT_FOUND.to_string()));
        }
        Self::read_session(&path).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(SESSION_NOT_FOUND.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pd_core::{DraftVersion, Step1Data, Step2Data, Step3Data};

    pub(crate) fn session(id: &str, minutes: i64) -> SavedSession {
        let created_at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes);
        SavedSession {
            id: id.to_string(),
            created_at,
            title: format!("발명 {}", id),
            step1_data: Step1Data {
                memo_text: "스마트 관수 메모".into(),
                invention_title: format!("발명 {}", id),
                ..Default::default()
            },
            step2_data: Step2Data {
                selected_keywords: vec!["센서".into(), "관수".into(), "무선".into(), "제어".into()],
                ..Default::default()
            },
            step3_data: Step3Data::default(),
            draft_versions: vec![DraftVersion {
                version: 1,
                content: "초안".into(),
                timestamp: created_at,
                feedback_used: None,
                extra: Default::default(),
            }],
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("saved")).await.unwrap();

        let saved = session("patent-1-aaaaaaa", 0);
        storage.save(&saved).await.unwrap();

        let raw = std::fs::read_to_string(storage.dir().join("patent-1-aaaaaaa.json")).unwrap();
        assert!(raw.contains("\n  \"id\""));
        assert!(raw.contains("\"draftVersions\""));
        assert_eq!(storage.get("patent-1-aaaaaaa").await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();
        storage.save(&session("older", 0)).await.unwrap();
        storage.save(&session("newer", 30)).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let list = storage.list().await.unwrap();
        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert_eq!(list[0].draft_count, 1);
        assert_eq!(list[0].keywords, vec!["센서", "관수", "무선"]);
    }

    #[tokio::test]
    async fn test_missing_session() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();

        let err = storage.get("patent-0-missing").await.unwrap_err();
        assert_eq!(err.kind().as_str(), "not_found");
        assert_eq!(err.user_message(), SESSION_NOT_FOUND);

        let err = storage.delete("patent-0-missing").await.unwrap_err();
        assert_eq!(err.kind().as_str(), "not_found");
    }

    #[tokio::test]
    async fn test_corrupt_session_is_file_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let err = storage.get("broken").await.unwrap_err();
        assert_eq!(err.kind().as_str(), "file_read_error");
        assert_eq!(err.kind().status_code(), 500);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();
        storage.save(&session("gone", 0)).await.unwrap();

        storage.delete("gone").await.unwrap();
        assert!(storage.list().await.unwrap().is_empty());
        assert!(!dir.path().join("gone.json").exists());
    }

    #[tokio::test]
    async fn test_path_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).await.unwrap();
        let err = storage.get("../secret").await.unwrap_err();
        assert_eq!(err.kind().as_str(), "validation_error");
    }
}
