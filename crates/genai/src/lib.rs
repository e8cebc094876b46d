//! Instrumented OpenAI chat and embeddings operations, with the HTTP endpoints exposing them.

use axum::{
    Router,
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
};
use axum_serde::Sonic;

mod api;
mod client;
mod error;
pub mod eval;
pub mod instrument;
pub mod messages;
pub mod provider;

pub use client::GenAiClient;
pub use error::{GenAiError, GenAiResult as Result};

use api::{ChatInput, ChatMetadata, ChatOutput, EmbedInput, EmbedMetadata, EmbedOutput};
use messages::{Caller, ChatMessage, ChatRequest, EmbeddingsRequest};

/// Creates an axum router for the GenAI endpoints.
pub fn router(client: GenAiClient) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/embed", post(embed))
        .with_state(client)
}

/// Handle a single-message chat completion.
async fn chat(State(client): State<GenAiClient>, Sonic(input): Sonic<ChatInput>) -> Result<impl IntoResponse> {
    input.validate()?;

    let request = ChatRequest {
        model: input.model.unwrap_or_else(|| client.chat_model().to_string()),
        messages: vec![ChatMessage::user(input.message)],
        temperature: Some(input.temperature),
        max_tokens: input.max_tokens,
        caller: Caller {
            user_id: input.user_id,
            session_id: input.session_id,
        },
    };

    log::debug!("Chat handler called for model: {}", request.model);

    let measured = client.chat(request.clone()).await?;
    let eval = client.evaluate(&request, &measured.response);

    let response = measured.response;

    let output = ChatOutput {
        metadata: ChatMetadata {
            finish_reason: response.finish_reason().map(str::to_owned),
            model: response.model,
            usage: response.usage,
            cost_usd: measured.cost.usd(),
            duration_seconds: measured.duration.as_secs_f64(),
        },
        response: response.content,
        eval,
    };

    Ok(Json(output))
}

/// Handle an embeddings request for a batch of texts.
async fn embed(State(client): State<GenAiClient>, Sonic(input): Sonic<EmbedInput>) -> Result<impl IntoResponse> {
    input.validate()?;

    let request = EmbeddingsRequest {
        model: input.model.unwrap_or_else(|| client.embedding_model().to_string()),
        input: input.texts,
        caller: Caller {
            user_id: input.user_id,
            session_id: None,
        },
    };

    log::debug!(
        "Embed handler called for model: {} with {} texts",
        request.model,
        request.input.len()
    );

    let measured = client.embeddings(request).await?;
    let response = measured.response;

    let output = EmbedOutput {
        embeddings_created: response.embeddings.len(),
        embeddings: response.embeddings,
        metadata: EmbedMetadata {
            model: response.model,
            usage: response.usage,
            cost_usd: measured.cost.usd(),
            duration_seconds: measured.duration.as_secs_f64(),
        },
    };

    Ok(Json(output))
}
