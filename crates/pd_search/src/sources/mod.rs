pub mod biznavi;
pub mod files;
pub mod llm;

pub use biznavi::BiznaviClient;
pub use files::FilePatentSource;
pub use llm::LlmPatentSource;
