use pd_core::Result;

pub mod draft;
pub mod models;
pub mod parse;
pub mod prompts;

pub use pd_core::InferenceModel;

pub const DEFAULT_MODEL_NAME: &str = "gpt-oss:120b-128k";

#[derive(Clone)]
pub struct InferenceConfig {
    /// Backend kind: `ollama`, `gemini` or `dummy`.
    pub model: String,
    pub model_url: Option<String>,
    pub model_name: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("model", &self.model)
            .field("model_url", &self.model_url)
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model: "ollama".to_string(),
            model_url: None,
            model_name: None,
            api_key: None,
        }
    }
}

impl InferenceConfig {
    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL_NAME)
    }
}

pub mod prelude {
    pub use super::InferenceConfig;
    pub use super::models::create_model;
    pub use pd_core::{GenerationRequest, InferenceModel, Result, Error};
}

pub use models::create_model;

/// Run the extraction prompt and recover the structured fields.
pub async fn extract_invention_data(
    model: &dyn InferenceModel,
    text: &str,
) -> Result<pd_core::ExtractedData> {
    let generated = model.generate(&prompts::extraction_request(text)).await?;
    if generated.trim().is_empty() {
        return Err(pd_core::Error::EmptyResponse("키워드 추출 결과가 없습니다.".to_string()));
    }
    parse::parse_extraction(&generated)
}

/// Run the draft prompt and reject timeout or HTML pages passed off as text.
pub async fn generate_draft(
    model: &dyn InferenceModel,
    request: &pd_core::GenerateRequest,
) -> Result<String> {
    let generated = model.generate(&prompts::draft_request(request)?).await?;
    parse::check_draft(&generated)?;
    Ok(generated)
}
