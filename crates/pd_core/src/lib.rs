pub mod error;
pub mod models;
pub mod search;
pub mod session;
pub mod storage;
pub mod types;
pub mod workflow;

pub use error::{Error, ErrorKind};
pub use models::{GenerationRequest, InferenceModel};
pub use search::PatentSearch;
pub use storage::SessionStorage;
pub use types::*;
pub use workflow::{PatentWorkflow, Step};

pub type Result<T> = std::result::Result<T, Error>;

/// Message returned when a saved session cannot be found.
pub const SESSION_NOT_FOUND: &str = "저장된 기록을 찾을 수 없습니다.";
