use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use pd_core::{Error, GenerationRequest, Result};
use super::{upstream_error, InferenceModel};
use crate::InferenceConfig;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Check the shape of a Google API key before any call is made.
pub fn validate_api_key(api_key: Option<&str>) -> Result<&str> {
    match api_key {
        None | Some("") => Err(Error::MissingCredentials("API 키가 설정되지 않았습니다.".to_string())),
        Some(key) if !key.starts_with("AIza") => Err(Error::InvalidCredentials(
            "유효하지 않은 API 키 형식입니다. Google API 키는 'AIza'로 시작해야 합니다.".to_string(),
        )),
        Some(key) => Ok(key),
    }
}

pub struct GeminiModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl GeminiModel {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let api_key = validate_api_key(config.api_key.as_deref())?.to_string();
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client: Arc::new(client),
            api_key,
            base_url: config
                .model_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model_name: config.model_name.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl InferenceModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let model = request.model.as_deref().unwrap_or(&self.model_name);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: &request.prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                top_k: request.top_k,
                top_p: request.top_p,
            },
        };

        debug!("Calling Gemini model {}", model);
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Gemini API error: {}", status);
            return Err(upstream_error(status.as_u16(), &text));
        }

        let data: GenerateContentResponse = response.json().await?;
        let text = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::EmptyResponse("생성된 텍스트가 없습니다.".to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(url: String) -> InferenceConfig {
        InferenceConfig {
            model: "gemini".into(),
            model_url: Some(url),
            model_name: Some("gemini-test".into()),
            api_key: Some("AIzaTestKey".into()),
        }
    }

    #[test]
    fn test_api_key_shape() {
        assert!(matches!(validate_api_key(None), Err(Error::MissingCredentials(_))));
        assert!(matches!(validate_api_key(Some("sk-123")), Err(Error::InvalidCredentials(_))));
        assert_eq!(validate_api_key(Some("AIza123")).unwrap(), "AIza123");
    }

    #[tokio::test]
    async fn test_generate_joins_parts() {
        let router = Router::new().route(
            "/models/:model",
            post(|Query(params): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                assert_eq!(params.get("key").map(String::as_str), Some("AIzaTestKey"));
                assert_eq!(body["generationConfig"]["topK"], 40);
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "첫째 " }, { "text": "둘째" }] } }]
                }))
            }),
        );
        let model = GeminiModel::new(&config(serve(router).await)).unwrap();
        let request = GenerationRequest::new("prompt").top_k(40);
        assert_eq!(model.generate(&request).await.unwrap(), "첫째 둘째");
    }

    #[tokio::test]
    async fn test_generate_reports_forbidden() {
        let router = Router::new().route(
            "/models/:model",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "error": { "code": 403, "message": "API key not valid" } })),
                )
            }),
        );
        let model = GeminiModel::new(&config(serve(router).await)).unwrap();
        let err = model.generate(&GenerationRequest::new("prompt")).await.unwrap_err();
        assert_eq!(err.kind().as_str(), "forbidden");
    }
}
