use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, warn};

use crate::error::{GeminiError, Result};
use crate::producer::TextProducer;
use crate::types::{
    ApiErrorResponse, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_content(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerateContentResponse> {
        let request = GenerateContentRequest::new(prompt, config.clone());

        debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            max_output_tokens = config.max_output_tokens,
            "Calling generateContent"
        );

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&body) {
                error!(
                    status = status.as_u16(),
                    message = %parsed.error.message,
                    "Gemini API error"
                );
                return Err(GeminiError::Api {
                    message: parsed.error.message,
                    status_code: Some(status.as_u16()),
                });
            }

            return Err(GeminiError::Api {
                message: body,
                status_code: Some(status.as_u16()),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        Ok(body)
    }
}

#[async_trait]
impl TextProducer for GeminiClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let response = self.generate_content(prompt, config).await?;

        match response.text() {
            Some(text) => Ok(text),
            None => {
                warn!(model = %self.model, "Response contained no candidate text");
                Err(GeminiError::EmptyResponse)
            }
        }
    }
}
