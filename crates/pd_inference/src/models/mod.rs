use std::sync::Arc;
use pd_core::{Error, Result};
use tracing::info;
use crate::InferenceConfig;

pub mod dummy;
pub mod gemini;
pub mod ollama;

pub use pd_core::InferenceModel;

pub async fn create_model(config: &InferenceConfig) -> Result<Arc<dyn InferenceModel>> {
    let model: Arc<dyn InferenceModel> = match config.model.as_str() {
        "ollama" => Arc::new(ollama::OllamaModel::new(config)?),
        "gemini" => Arc::new(gemini::GeminiModel::new(config)?),
        "dummy" => Arc::new(dummy::DummyModel::new()),
        other => {
            return Err(Error::Inference(format!(
                "Unknown model backend '{}'. Available models: ollama, gemini, dummy",
                other
            )))
        }
    };
    info!("🧠 Inference model ready: {} ({})", model.name(), config.model_name());
    Ok(model)
}

/// Turn a non-success body from a generation endpoint into an `Error::Upstream`.
///
/// Understands Google-style `{"error": {"code", "message", "details"}}` bodies,
/// plain `{"error": "..."}` / `{"message": "..."}` bodies and raw text.
pub(crate) fn upstream_error(status: u16, body: &str) -> Error {
    let snippet: String = body.chars().take(200).collect();
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Error::Upstream { status, message: snippet, retry_after: None };
    };

    let error = &value["error"];
    let status = error["code"].as_u64().and_then(|c| u16::try_from(c).ok()).unwrap_or(status);
    let message = error["message"]
        .as_str()
        .or_else(|| error.as_str())
        .or_else(|| value["message"].as_str())
        .map(str::to_string)
        .unwrap_or(snippet);
    let retry_after = error["details"].as_array().and_then(|details| {
        details
            .iter()
            .find(|d| d["@type"].as_str().is_some_and(|t| t.contains("RetryInfo")))
            .and_then(|d| d["retryDelay"].as_str())
            .map(str::to_string)
    });

    Error::Upstream { status, message, retry_after }
}
