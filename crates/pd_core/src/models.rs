use async_trait::async_trait;
use crate::Result;

/// Sampling settings for one call to a text-generation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    /// Overrides the backend's configured model for this call.
    pub model: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.7,
            max_output_tokens: 8192,
            top_k: None,
            top_p: None,
            model: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

#[async_trait]
pub trait InferenceModel: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Run the prompt and return the generated text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
