//! LLM provider clients behind narrow traits so pipelines can be tested
//! with in-memory doubles.

use crate::config::LlmConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const CHAT_TEMPERATURE: f64 = 0.7;
const CHAT_MAX_TOKENS: u32 = 2000;
const VISION_TEMPERATURE: f64 = 0.3;
const VISION_MAX_TOKENS: u32 = 500;

/// Text-in, text-out completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Multimodal analysis of a single image, forced to JSON output.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn analyze_image(
        &self,
        prompt: &str,
        image_data_url: &str,
    ) -> Result<String, ServiceError>;
}

/// Groq OpenAI-compatible client serving both traits.
#[derive(Clone, Debug)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    chat_model: String,
    vision_model: String,
}

impl GroqClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ServiceError> {
        let api_key = config
            .groq_api_key
            .clone()
            .ok_or_else(|| ServiceError::ConfigError("groq_api_key is not set".to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::ConfigError(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            http,
            api_key,
            chat_model: config.chat_model.clone(),
            vision_model: config.vision_model.clone(),
        })
    }

    async fn chat_completion(&self, body: Value) -> Result<String, ServiceError> {
        let response = self
            .http
            .post(GROQ_CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("LLM request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ServiceError::RateLimitExceeded);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "LLM returned {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed LLM response: {e}"))
        })?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                ServiceError::ExternalServiceError("LLM response missing content".to_string())
            })?;
        debug!("LLM returned {} chars", content.len());
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    #[instrument(skip(self, prompt), fields(model = %self.chat_model))]
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = json!({
            "model": self.chat_model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": CHAT_TEMPERATURE,
            "max_tokens": CHAT_MAX_TOKENS,
        });
        self.chat_completion(body).await
    }
}

#[async_trait]
impl VisionModel for GroqClient {
    #[instrument(skip(self, prompt, image_data_url), fields(model = %self.vision_model))]
    async fn analyze_image(
        &self,
        prompt: &str,
        image_data_url: &str,
    ) -> Result<String, ServiceError> {
        let body = json!({
            "model": self.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": image_data_url}},
                ],
            }],
            "temperature": VISION_TEMPERATURE,
            "max_tokens": VISION_MAX_TOKENS,
            "response_format": {"type": "json_object"},
        });
        self.chat_completion(body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = LlmConfig::default();
        let err = GroqClient::from_config(&config).unwrap_err();
        assert!(matches!(err, ServiceError::ConfigError(_)));
    }
}
