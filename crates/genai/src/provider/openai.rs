mod input;
mod output;

use async_trait::async_trait;
use config::OpenAiConfig;
use reqwest::{Client, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use telemetry::ServerEndpoint;

use self::{
    input::{OpenAIChatRequest, OpenAIEmbeddingsRequest},
    output::{OpenAIChatResponse, OpenAIEmbeddingsResponse},
};

use crate::{
    error::{GenAiError, GenAiResult},
    messages::{ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse},
    provider::{Provider, http_client::default_http_client_builder},
};

pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    server: Option<ServerEndpoint>,
}

impl OpenAIProvider {
    pub fn new(config: &OpenAiConfig) -> GenAiResult<Self> {
        let client = default_http_client_builder(config.timeout).build().map_err(|e| {
            log::error!("Failed to create HTTP client for OpenAI provider: {e}");
            GenAiError::Internal(format!("failed to create HTTP client: {e}"))
        })?;

        if config.api_key.is_none() {
            log::warn!("No OpenAI API key configured, requests will be sent unauthenticated");
        }

        let server = config.base_url.host_str().map(|host| ServerEndpoint {
            address: host.to_string(),
            port: config.base_url.port_or_known_default().unwrap_or(443),
        });

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            server,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> GenAiResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);

        let body = sonic_rs::to_vec(body)
            .map_err(|e| GenAiError::InvalidRequest(format!("Failed to serialize request: {e}")))?;

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body);

        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {}", key.expose_secret()));
        }

        let response = request.send().await.map_err(|e| {
            log::error!("Failed to send request to OpenAI: {e}");
            GenAiError::from(e)
        })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("OpenAI API error ({status}): {error_text}");

            return Err(GenAiError::from_status(status.as_u16(), error_text));
        }

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read OpenAI response body: {e}");
            GenAiError::from(e)
        })?;

        sonic_rs::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse OpenAI response from {path}: {e}");
            log::debug!("Response parsing failed, length: {} bytes", response_text.len());

            GenAiError::InvalidResponse(e.to_string())
        })
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn server(&self) -> Option<ServerEndpoint> {
        self.server.clone()
    }

    async fn chat_completion(&self, request: ChatRequest) -> GenAiResult<ChatResponse> {
        let body = OpenAIChatRequest::from(&request);
        let response: OpenAIChatResponse = self.post("chat/completions", &body).await?;

        Ok(ChatResponse::from(response))
    }

    async fn embeddings(&self, request: EmbeddingsRequest) -> GenAiResult<EmbeddingsResponse> {
        let body = OpenAIEmbeddingsRequest::from(&request);
        let response: OpenAIEmbeddingsResponse = self.post("embeddings", &body).await?;

        Ok(EmbeddingsResponse::from(response))
    }
}
