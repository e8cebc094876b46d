use std::{future::Future, sync::Arc};

use telemetry::{PriceTable, Telemetry};
use tower::{ServiceBuilder, ServiceExt, service_fn};

use crate::{
    error::GenAiResult,
    eval::{Evaluation, Evaluator},
    instrument::{Instrument, Measured},
    messages::{ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse},
    provider::{Provider, openai::OpenAIProvider},
};

/// Instrumented access to the chat and embeddings operations.
#[derive(Clone)]
pub struct GenAiClient {
    provider: Arc<dyn Provider>,
    instrument: Instrument,
    evaluator: Option<Evaluator>,
    chat_model: String,
    embedding_model: String,
}

impl GenAiClient {
    pub fn new(config: &config::Config, telemetry: &Telemetry) -> GenAiResult<Self> {
        let provider = Arc::new(OpenAIProvider::new(&config.openai)?);
        Ok(Self::with_provider(config, telemetry, provider))
    }

    pub fn with_provider(config: &config::Config, telemetry: &Telemetry, provider: Arc<dyn Provider>) -> Self {
        let prices = Arc::new(PriceTable::new(&config.pricing));
        let instrument = Instrument::new(telemetry.recorders().clone(), prices, provider.server());

        let evaluator = config
            .evaluation
            .enabled
            .then(|| Evaluator::new(telemetry.recorders().clone(), config.evaluation.pass_threshold));

        log::debug!(
            "GenAI client using provider {} with {} instrumentation path(s)",
            provider.name(),
            telemetry.recorders().origins().len()
        );

        Self {
            provider,
            instrument,
            evaluator,
            chat_model: config.openai.chat_model.clone(),
            embedding_model: config.openai.embedding_model.clone(),
        }
    }

    /// Model used when a chat request does not name one.
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    /// Model used when an embeddings request does not name one.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// The returned future owns everything it needs and does not borrow the client.
    pub fn chat(
        &self,
        request: ChatRequest,
    ) -> impl Future<Output = GenAiResult<Measured<ChatResponse>>> + Send + 'static {
        let provider = self.provider.clone();
        let instrument = self.instrument.clone();

        let service = service_fn(move |request: ChatRequest| {
            let provider = provider.clone();
            async move { provider.chat_completion(request).await }
        });

        ServiceBuilder::new().layer(instrument).service(service).oneshot(request)
    }

    pub fn embeddings(
        &self,
        request: EmbeddingsRequest,
    ) -> impl Future<Output = GenAiResult<Measured<EmbeddingsResponse>>> + Send + 'static {
        let provider = self.provider.clone();
        let instrument = self.instrument.clone();

        let service = service_fn(move |request: EmbeddingsRequest| {
            let provider = provider.clone();
            async move { provider.embeddings(request).await }
        });

        ServiceBuilder::new().layer(instrument).service(service).oneshot(request)
    }

    /// Evaluate the completion of `request`, if evaluation is enabled.
    pub fn evaluate(&self, request: &ChatRequest, response: &ChatResponse) -> Option<Evaluation> {
        let evaluator = self.evaluator.as_ref()?;
        let prompt = request.messages.last().map(|message| message.content.as_str()).unwrap_or_default();

        Some(evaluator.evaluate(
            prompt,
            &response.content,
            &request.model,
            request.caller.user_id.as_deref(),
        ))
    }
}
