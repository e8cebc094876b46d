//! Provider-independent request and response types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Token counts as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Who asked, for attribution in telemetry. Never sent to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub caller: Caller,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub id: Option<String>,
    pub model: String,
    pub content: String,
    /// One entry per returned choice.
    pub finish_reasons: Vec<String>,
    pub usage: Usage,
}

impl ChatResponse {
    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reasons.first().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub input: Vec<String>,
    pub caller: Caller,
}

#[derive(Debug, Clone)]
pub struct EmbeddingsResponse {
    pub model: String,
    pub embeddings: Vec<Vec<f32>>,
    pub usage: Usage,
}
