//! Response bodies of the OpenAI API.

use serde::Deserialize;

use crate::messages::{ChatResponse, EmbeddingsResponse, Usage};

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub model: String,
    pub choices: Vec<OpenAIChoice>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIChoice {
    pub message: OpenAIMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl From<OpenAIChatResponse> for ChatResponse {
    fn from(response: OpenAIChatResponse) -> Self {
        let finish_reasons = response
            .choices
            .iter()
            .filter_map(|choice| choice.finish_reason.clone())
            .collect();

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Self {
            id: response.id,
            model: response.model,
            content,
            finish_reasons,
            usage: response.usage,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIEmbeddingsResponse {
    pub model: String,
    pub data: Vec<OpenAIEmbedding>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenAIEmbedding {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
}

impl From<OpenAIEmbeddingsResponse> for EmbeddingsResponse {
    fn from(mut response: OpenAIEmbeddingsResponse) -> Self {
        response.data.sort_by_key(|embedding| embedding.index);

        Self {
            model: response.model,
            embeddings: response.data.into_iter().map(|data| data.embedding).collect(),
            usage: response.usage,
        }
    }
}
