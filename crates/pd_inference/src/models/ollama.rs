use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;
use pd_core::{Error, GenerationRequest, Result};
use super::{upstream_error, InferenceModel};
use crate::InferenceConfig;

const DEFAULT_URL: &str = "http://localhost:11434/api/generate";

/// Generation can run for several minutes on long drafts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Fields different generate-style servers use for the produced text.
const TEXT_FIELDS: [&str; 5] = ["response", "text", "content", "output", "result"];

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaModel {
    client: Arc<Client>,
    url: Url,
    model_name: String,
}

impl fmt::Debug for OllamaModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaModel")
            .field("client", &"<reqwest::Client>")
            .field("url", &self.url.as_str())
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OllamaModel {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let raw = config.model_url.as_deref().unwrap_or(DEFAULT_URL);
        let url = Url::parse(raw)
            .map_err(|e| Error::Inference(format!("Invalid model URL '{}': {}", raw, e)))?;
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client: Arc::new(client),
            url,
            model_name: config.model_name().to_string(),
        })
    }
}

fn generated_text(data: &Value) -> Option<String> {
    TEXT_FIELDS
        .iter()
        .filter_map(|field| data[*field].as_str())
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl InferenceModel for OllamaModel {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = GenerateBody {
            model: request.model.as_deref().unwrap_or(&self.model_name),
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_output_tokens,
                top_k: request.top_k,
                top_p: request.top_p,
            },
        };

        debug!("Calling {} with model {}", self.url, body.model);
        let response = self.client.post(self.url.clone()).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Generation API error: {} {}", status, text.chars().take(200).collect::<String>());
            return Err(upstream_error(status.as_u16(), &text));
        }

        let data: Value = response.json().await?;
        generated_text(&data).ok_or_else(|| {
            error!("No generated text in response: {}", data);
            Error::EmptyResponse("생성된 텍스트가 없습니다.".to_string())
        })
    }
}
