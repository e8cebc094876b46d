//! A local stand-in for the OpenAI chat completions and embeddings API.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const CHAT_CONTENT: &str = "Rust is a systems programming language focused on safety.";
pub const PROMPT_TOKENS: u64 = 50;
pub const COMPLETION_TOKENS: u64 = 120;

#[derive(Debug, Clone, Default)]
pub struct TestOpenAIBehavior {
    /// Sleep before answering.
    pub delay: Option<Duration>,
    /// Fail every request with this status.
    pub error_status: Option<u16>,
    /// Model reported in responses instead of the requested one.
    pub response_model: Option<String>,
}

#[derive(Clone)]
struct MockState {
    behavior: TestOpenAIBehavior,
    requests: Arc<AtomicUsize>,
}

/// Mock OpenAI server running on a random local port.
pub struct TestOpenAIServer {
    address: SocketAddr,
    requests: Arc<AtomicUsize>,
    shutdown: CancellationToken,
}

impl TestOpenAIServer {
    pub async fn start() -> Self {
        Self::start_with(TestOpenAIBehavior::default()).await
    }

    pub async fn start_with(behavior: TestOpenAIBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let requests = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        let state = MockState {
            behavior,
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/embeddings", post(embeddings))
            .with_state(state);

        tokio::spawn({
            let shutdown = shutdown.clone();

            async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
                    .unwrap();
            }
        });

        Self {
            address,
            requests,
            shutdown,
        }
    }

    /// Base URL to configure as `openai.base_url`.
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.address)
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Number of requests received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for TestOpenAIServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Deserialize)]
struct ChatBody {
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingsBody {
    model: String,
    input: Vec<String>,
}

impl MockState {
    async fn enter(&self) -> Option<Response> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.behavior.delay {
            tokio::time::sleep(delay).await;
        }

        let status = self.behavior.error_status?;
        let status = StatusCode::from_u16(status).unwrap();

        let body = json!({
            "error": {
                "message": "mock failure",
                "type": "server_error",
            }
        });

        Some((status, Json(body)).into_response())
    }

    fn model(&self, requested: String) -> String {
        self.behavior.response_model.clone().unwrap_or(requested)
    }
}

async fn chat_completions(State(state): State<MockState>, Json(body): Json<ChatBody>) -> Response {
    if let Some(response) = state.enter().await {
        return response;
    }

    Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": state.model(body.model),
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": CHAT_CONTENT},
            "finish_reason": "stop",
        }],
        "usage": {
            "prompt_tokens": PROMPT_TOKENS,
            "completion_tokens": COMPLETION_TOKENS,
            "total_tokens": PROMPT_TOKENS + COMPLETION_TOKENS,
        },
    }))
    .into_response()
}

async fn embeddings(State(state): State<MockState>, Json(body): Json<EmbeddingsBody>) -> Response {
    if let Some(response) = state.enter().await {
        return response;
    }

    let tokens: usize = body.input.iter().map(|text| text.split_whitespace().count()).sum();

    let data: Vec<_> = body
        .input
        .iter()
        .enumerate()
        .map(|(index, _)| json!({"object": "embedding", "index": index, "embedding": [0.1, 0.2, 0.3]}))
        .collect();

    Json(json!({
        "object": "list",
        "model": state.model(body.model),
        "data": data,
        "usage": {"prompt_tokens": tokens, "total_tokens": tokens},
    }))
    .into_response()
}
