use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use rand::Rng;
use tracing::info;
use pd_core::{Error, Result, SessionStorage};

pub mod backends;

pub use backends::*;

pub const DEFAULT_DATA_DIR: &str = "data/saved-patents";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// New session id: `patent-{unix millis}-{7 base36 chars}`.
pub fn generate_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..7)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("patent-{}-{}", millis, suffix)
}

/// Ids become file names, so anything that could leave the directory is refused.
pub(crate) fn check_id(id: &str) -> Result<()> {
    if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
        return Err(Error::Validation(format!("잘못된 기록 ID입니다: {}", id)));
    }
    Ok(())
}

pub async fn create_storage(kind: &str, dir: Option<&Path>) -> Result<Arc<dyn SessionStorage>> {
    match kind {
        "file" => {
            let dir = dir.unwrap_or_else(|| Path::new(DEFAULT_DATA_DIR));
            info!("💾 Using file storage at {}", dir.display());
            Ok(Arc::new(FileStorage::new(dir).await?))
        }
        "memory" => {
            info!("💾 Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, generate_id, DEFAULT_DATA_DIR};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "patent");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), 7);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_id(), id);
    }

    #[test]
    fn test_check_id() {
        assert!(check_id("patent-1-abc").is_ok());
        assert!(check_id("../etc/passwd").is_err());
        assert!(check_id("a/b").is_err());
        assert!(check_id("a\\b").is_err());
        assert!(check_id("").is_err());
    }

    #[tokio::test]
    async fn test_create_storage() {
        let dir = tempfile::tempdir().unwrap();
        assert!(create_storage("file", Some(dir.path())).await.is_ok());
        assert!(create_storage("memory", None).await.is_ok());
        assert!(create_storage("sqlite", None).await.is_err());
    }
}
