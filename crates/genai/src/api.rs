//! Bodies of the `/chat` and `/embed` endpoints.

use serde::{Deserialize, Serialize};

use crate::{error::GenAiError, eval::Evaluation, messages::Usage};

const MAX_TEMPERATURE: f32 = 2.0;

fn default_temperature() -> f32 {
    0.7
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatInput {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatInput {
    pub fn validate(&self) -> Result<(), GenAiError> {
        if self.message.trim().is_empty() {
            return Err(GenAiError::InvalidRequest("message must not be empty".to_string()));
        }

        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(GenAiError::InvalidRequest(format!(
                "temperature must be between 0 and {MAX_TEMPERATURE}, got {}",
                self.temperature
            )));
        }

        if self.max_tokens == Some(0) {
            return Err(GenAiError::InvalidRequest("max_tokens must be positive".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatOutput {
    pub response: String,
    pub metadata: ChatMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval: Option<Evaluation>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMetadata {
    pub model: String,
    pub usage: Usage,
    pub cost_usd: Option<f64>,
    pub duration_seconds: f64,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbedInput {
    pub texts: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl EmbedInput {
    pub fn validate(&self) -> Result<(), GenAiError> {
        if self.texts.is_empty() {
            return Err(GenAiError::InvalidRequest("texts must not be empty".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedOutput {
    pub embeddings_created: usize,
    pub embeddings: Vec<Vec<f32>>,
    pub metadata: EmbedMetadata,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedMetadata {
    pub model: String,
    pub usage: Usage,
    pub cost_usd: Option<f64>,
    pub duration_seconds: f64,
}
