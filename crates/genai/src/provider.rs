pub(crate) mod http_client;
pub mod openai;

use async_trait::async_trait;
use telemetry::ServerEndpoint;

use crate::{
    error::GenAiResult,
    messages::{ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse},
};

/// An upstream GenAI API.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Host and port of the upstream API, for the server attributes.
    fn server(&self) -> Option<ServerEndpoint>;

    async fn chat_completion(&self, request: ChatRequest) -> GenAiResult<ChatResponse>;

    async fn embeddings(&self, request: EmbeddingsRequest) -> GenAiResult<EmbeddingsResponse>;
}
