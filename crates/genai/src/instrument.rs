//! Tower layer recording every GenAI operation through the telemetry recorders.
//!
//! The wrapped service sees the request unchanged. Its result is returned unchanged
//! too, with the measured duration and estimated cost attached on success.

use std::{
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant, SystemTime},
};

use futures::future::BoxFuture;
use telemetry::{
    Cost, ErrorInfo, OperationKind, OperationRecord, Outcome, PriceTable, Recorders, ServerEndpoint, TokenUsage,
};
use tower::Service;

use crate::messages::{Caller, ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse};

/// Value of `gen_ai.system` for every operation made by this crate.
pub const SYSTEM: &str = "openai";

pub trait Request {
    fn kind(&self) -> OperationKind;

    fn model(&self) -> &str;

    fn temperature(&self) -> Option<f64> {
        None
    }

    fn max_tokens(&self) -> Option<u32> {
        None
    }

    fn caller(&self) -> &Caller;
}

pub trait Response {
    fn id(&self) -> Option<&str>;

    fn model(&self) -> Option<&str>;

    fn usage(&self) -> TokenUsage;

    fn finish_reasons(&self) -> &[String] {
        &[]
    }
}

pub trait Error: std::fmt::Display {
    /// Exception class name, never empty.
    fn error_type(&self) -> &str;
}

impl Request for ChatRequest {
    fn kind(&self) -> OperationKind {
        OperationKind::Chat
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn temperature(&self) -> Option<f64> {
        self.temperature.map(f64::from)
    }

    fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    fn caller(&self) -> &Caller {
        &self.caller
    }
}

impl Request for EmbeddingsRequest {
    fn kind(&self) -> OperationKind {
        OperationKind::Embeddings
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn caller(&self) -> &Caller {
        &self.caller
    }
}

impl Response for ChatResponse {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    fn usage(&self) -> TokenUsage {
        TokenUsage {
            input: self.usage.prompt_tokens,
            output: self.usage.completion_tokens,
        }
    }

    fn finish_reasons(&self) -> &[String] {
        &self.finish_reasons
    }
}

impl Response for EmbeddingsResponse {
    fn id(&self) -> Option<&str> {
        None
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    fn usage(&self) -> TokenUsage {
        TokenUsage {
            input: self.usage.prompt_tokens,
            output: 0,
        }
    }
}

/// A successful response together with what was measured around it.
#[derive(Debug, Clone)]
pub struct Measured<R> {
    pub response: R,
    pub duration: Duration,
    pub cost: Cost,
}

#[derive(Clone)]
pub struct Instrument {
    recorders: Recorders,
    prices: Arc<PriceTable>,
    server: Option<ServerEndpoint>,
}

impl Instrument {
    pub fn new(recorders: Recorders, prices: Arc<PriceTable>, server: Option<ServerEndpoint>) -> Self {
        Self {
            recorders,
            prices,
            server,
        }
    }
}

impl<S> tower::Layer<S> for Instrument {
    type Service = InstrumentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InstrumentService {
            inner,
            instrument: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct InstrumentService<S> {
    inner: S,
    instrument: Instrument,
}

impl<S, Req, Resp> Service<Req> for InstrumentService<S>
where
    S: Service<Req, Response = Resp>,
    S::Future: Send + 'static,
    Req: Request,
    Resp: Response + Send + 'static,
    S::Error: Error + Send + 'static,
{
    type Response = Measured<Resp>;

    type Error = S::Error;

    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let mut record = OperationRecord::new(req.kind(), SYSTEM, req.model());

        record.temperature = req.temperature();
        record.max_tokens = req.max_tokens();
        record.user_id = req.caller().user_id.clone();
        record.session_id = req.caller().session_id.clone();
        record.server = self.instrument.server.clone();

        let instrument = self.instrument.clone();
        let start = Instant::now();
        record.started_at = SystemTime::now();

        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;
            record.duration = start.elapsed();

            match result {
                Ok(response) => {
                    record.usage = response.usage();
                    record.response_id = response.id().map(str::to_owned);
                    record.response_model = response.model().map(str::to_owned);
                    record.finish_reasons = response.finish_reasons().to_vec();
                    record.cost = instrument.estimate(&record);

                    log::info!(
                        operation = record.kind.operation_name(),
                        model = record.request_model.as_str(),
                        input_tokens = record.usage.input,
                        output_tokens = record.usage.output,
                        cost_usd:? = record.cost.usd(),
                        duration_seconds = record.duration.as_secs_f64();
                        "GenAI {} successful",
                        record.kind.operation_name()
                    );

                    instrument.recorders.record_operation(&record);

                    Ok(Measured {
                        response,
                        duration: record.duration,
                        cost: record.cost,
                    })
                }
                Err(error) => {
                    log::warn!(
                        operation = record.kind.operation_name(),
                        model = record.request_model.as_str(),
                        error_type = error.error_type(),
                        duration_seconds = record.duration.as_secs_f64();
                        "GenAI {} failed: {error}",
                        record.kind.operation_name()
                    );

                    record.outcome = Outcome::Error(ErrorInfo::new(error.error_type(), error.to_string()));
                    instrument.recorders.record_operation(&record);

                    Err(error)
                }
            }
        })
    }
}

impl Instrument {
    /// Price by the requested model, falling back to the model the provider reports
    /// when only that one has a price entry.
    fn estimate(&self, record: &OperationRecord) -> Cost {
        let model = match record.response_model.as_deref() {
            Some(response_model)
                if self.prices.price(&record.request_model).is_none()
                    && self.prices.price(response_model).is_some() =>
            {
                response_model
            }
            _ => record.request_model.as_str(),
        };

        self.prices.estimate(model, record.usage.input, record.usage.output)
    }
}
