//! Request bodies of the OpenAI API.

use serde::Serialize;

use crate::messages::{ChatMessage, ChatRequest, EmbeddingsRequest};

#[derive(Debug, Serialize)]
pub(super) struct OpenAIChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
}

impl<'a> From<&'a ChatRequest> for OpenAIChatRequest<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            user: request.caller.user_id.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OpenAIEmbeddingsRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
}

impl<'a> From<&'a EmbeddingsRequest> for OpenAIEmbeddingsRequest<'a> {
    fn from(request: &'a EmbeddingsRequest) -> Self {
        Self {
            model: &request.model,
            input: &request.input,
            user: request.caller.user_id.as_deref(),
        }
    }
}
