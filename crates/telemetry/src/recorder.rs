//! Recorders carry out emission plans, one per instrumentation path.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use opentelemetry::{
    InstrumentationScope, KeyValue,
    trace::{Span, Status, Tracer, TracerProvider as _},
};
use opentelemetry_sdk::{
    metrics::SdkMeterProvider,
    trace::{SdkTracer, SdkTracerProvider},
};

use crate::{
    attributes::{EXCEPTION_MESSAGE, EXCEPTION_TYPE},
    metrics::{self, MetricRegistry},
    origin::Origin,
    record::{Emission, EvaluationRecord, MetricUpdate, OperationRecord, RequestRecord},
};

pub trait Recorder: Send + Sync {
    fn origin(&self) -> Origin;

    fn record_operation(&self, record: &OperationRecord);

    fn record_evaluation(&self, record: &EvaluationRecord);

    /// Called once the request arrives, before it is handled.
    fn request_started(&self, _record: &RequestRecord) {}

    /// Called once per started request, after the response status is known.
    fn record_request(&self, _record: &RequestRecord) {}
}

/// Emits under one naming convention, through its own tracer and instruments.
pub struct PathRecorder {
    origin: Origin,
    tracer: SdkTracer,
    registry: MetricRegistry,
}

impl PathRecorder {
    /// Registers the instruments of `registry` against the path's meter provider. The registry
    /// must be the one whose bucket view that provider was built with.
    pub fn new(
        origin: Origin,
        registry: MetricRegistry,
        tracer_provider: &SdkTracerProvider,
        meter_provider: &SdkMeterProvider,
    ) -> Self {
        let scope = InstrumentationScope::builder("lantern")
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();

        let tracer = tracer_provider.tracer_with_scope(scope);
        registry.register(&metrics::meter(meter_provider));

        Self {
            origin,
            tracer,
            registry,
        }
    }

    fn emit(&self, emission: Emission) {
        let Emission { span, metrics } = emission;

        let mut otel_span = self
            .tracer
            .span_builder(span.name)
            .with_kind(span.kind)
            .with_start_time(span.start)
            .with_attributes(span.attributes)
            .start(&self.tracer);

        if let Some(exception) = span.exception {
            otel_span.add_event_with_timestamp(
                "exception",
                span.end,
                vec![
                    KeyValue::new(EXCEPTION_TYPE, exception.kind().to_string()),
                    KeyValue::new(EXCEPTION_MESSAGE, exception.message().to_string()),
                ],
            );
        }

        match span.error {
            Some(message) => otel_span.set_status(Status::error(message)),
            None => otel_span.set_status(Status::Ok),
        }

        otel_span.end_with_timestamp(span.end);

        self.apply(&metrics);
    }

    fn apply(&self, updates: &[MetricUpdate]) {
        let Some(instruments) = self.registry.instruments() else {
            return;
        };

        for update in updates {
            instruments.record(update.measurement, update.value, &update.attributes);
        }
    }
}

impl Recorder for PathRecorder {
    fn origin(&self) -> Origin {
        self.origin
    }

    fn record_operation(&self, record: &OperationRecord) {
        self.emit(Emission::plan(record, self.registry.convention()));
    }

    fn record_evaluation(&self, record: &EvaluationRecord) {
        self.apply(&record.plan(self.registry.convention()));
    }

    fn request_started(&self, record: &RequestRecord) {
        self.apply(&[record.plan_start(self.registry.convention())]);
    }

    fn record_request(&self, record: &RequestRecord) {
        self.emit(record.plan(self.registry.convention()));
    }
}

/// Every active recorder. Callers record once; each path emits independently.
#[derive(Clone, Default)]
pub struct Recorders {
    recorders: Arc<[Arc<dyn Recorder>]>,
}

impl Recorders {
    pub fn new(recorders: Vec<Arc<dyn Recorder>>) -> Self {
        Self {
            recorders: recorders.into(),
        }
    }

    pub fn origins(&self) -> Vec<Origin> {
        self.recorders.iter().map(|recorder| recorder.origin()).collect()
    }

    /// Telemetry failures are logged and swallowed, they never reach the operation.
    pub fn record_operation(&self, record: &OperationRecord) {
        for recorder in self.recorders.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| recorder.record_operation(record)));

            if result.is_err() {
                log::error!(
                    "Failed to record {} operation telemetry for origin {}",
                    record.kind.operation_name(),
                    recorder.origin()
                );
            }
        }
    }

    pub fn record_evaluation(&self, record: &EvaluationRecord) {
        for recorder in self.recorders.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| recorder.record_evaluation(record)));

            if result.is_err() {
                log::error!("Failed to record evaluation telemetry for origin {}", recorder.origin());
            }
        }
    }

    pub fn request_started(&self, record: &RequestRecord) {
        for recorder in self.recorders.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| recorder.request_started(record)));

            if result.is_err() {
                log::error!("Failed to record request start for origin {}", recorder.origin());
            }
        }
    }

    pub fn record_request(&self, record: &RequestRecord) {
        for recorder in self.recorders.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| recorder.record_request(record)));

            if result.is_err() {
                log::error!(
                    "Failed to record {} {} request telemetry for origin {}",
                    record.method,
                    record.route,
                    recorder.origin()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use opentelemetry::{Value, trace::SpanKind};
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SpanData};

    use super::*;
    use crate::{
        convention::{NamingConvention, OperationKind},
        cost::PriceTable,
        exposition::{Exposition, sample_value},
        origin::build_resource,
        record::{ErrorInfo, Outcome, TokenUsage},
    };

    struct Path {
        spans: InMemorySpanExporter,
        tracer_provider: SdkTracerProvider,
        _meter_provider: SdkMeterProvider,
        recorder: Arc<PathRecorder>,
    }

    impl Path {
        fn new(origin: Origin, convention: &'static NamingConvention, exposition: &mut Exposition) -> Self {
            let telemetry = config::TelemetryConfig::default();
            let spans = InMemorySpanExporter::default();

            let tracer_provider = SdkTracerProvider::builder()
                .with_resource(build_resource(&telemetry, origin))
                .with_simple_exporter(spans.clone())
                .build();

            let registry = MetricRegistry::new(convention);

            let meter_provider = SdkMeterProvider::builder()
                .with_resource(build_resource(&telemetry, origin))
                .with_view(registry.bucket_view())
                .with_reader(exposition.reader().unwrap())
                .build();

            let recorder = Arc::new(PathRecorder::new(origin, registry, &tracer_provider, &meter_provider));

            Self {
                spans,
                tracer_provider,
                _meter_provider: meter_provider,
                recorder,
            }
        }

        fn finished_spans(&self) -> Vec<SpanData> {
            self.tracer_provider.force_flush().unwrap();
            self.spans.get_finished_spans().unwrap()
        }
    }

    fn attribute<'a>(span: &'a SpanData, key: &str) -> Option<&'a Value> {
        span.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    fn chat(model: &str, response_model: &str, input: u64, output: u64) -> OperationRecord {
        let mut record = OperationRecord::new(OperationKind::Chat, "openai", model);

        record.response_model = Some(response_model.to_string());
        record.usage = TokenUsage { input, output };
        record.duration = Duration::from_millis(800);
        record.cost = PriceTable::default().estimate(model, input, output);
        record.finish_reasons = vec!["stop".to_string()];

        record
    }

    #[test]
    fn one_span_per_operation() {
        let mut exposition = Exposition::default();
        let path = Path::new(Origin::OpenTelemetry, &NamingConvention::GEN_AI, &mut exposition);
        let recorders = Recorders::new(vec![path.recorder.clone()]);

        recorders.record_operation(&chat("gpt-4-turbo-preview", "gpt-4-0125-preview", 50, 120));

        let spans = path.finished_spans();
        assert_eq!(spans.len(), 1);

        let span = &spans[0];
        assert_eq!(span.name, "gen_ai.chat.completions");
        assert_eq!(span.span_kind, SpanKind::Client);
        assert_eq!(span.status, Status::Ok);
        assert!(span.events.events.is_empty());
        assert_eq!(
            attribute(span, "gen_ai.response.model"),
            Some(&Value::from("gpt-4-0125-preview"))
        );
        assert_eq!(attribute(span, "gen_ai.usage.total_tokens"), Some(&Value::I64(170)));

        let body = exposition.render();

        let count_line = body
            .lines()
            .find(|line| line.starts_with("gen_ai_client_operation_duration_seconds_count{"))
            .unwrap();

        assert!(count_line.ends_with(" 1"), "{body}");
        assert!(count_line.contains(r#"gen_ai_response_model="gpt-4-0125-preview""#), "{body}");
        assert!(body.contains("gen_ai_client_operation_cost_total{"), "{body}");
    }

    #[test]
    fn failed_operation_span_and_metrics() {
        let mut exposition = Exposition::default();
        let path = Path::new(Origin::OpenTelemetry, &NamingConvention::GEN_AI, &mut exposition);

        let mut record = OperationRecord::new(OperationKind::Embeddings, "openai", "text-embedding-ada-002");
        record.duration = Duration::from_secs(30);
        record.outcome = Outcome::Error(ErrorInfo::new("TimeoutError", "request timed out"));

        path.recorder.record_operation(&record);

        let spans = path.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, Status::error("request timed out"));
        assert_eq!(attribute(&spans[0], "error_type"), Some(&Value::from("TimeoutError")));

        let events = &spans[0].events.events;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "exception");
        assert_eq!(events[0].timestamp, record.ended_at());
        assert_eq!(
            events[0].attributes,
            vec![
                KeyValue::new("exception.type", "TimeoutError"),
                KeyValue::new("exception.message", "request timed out"),
            ]
        );

        let body = exposition.render();

        assert!(body.contains(r#"error_type="TimeoutError""#), "{body}");
        assert!(!body.contains("gen_ai_client_operation_cost"), "{body}");
        assert!(!body.contains("gen_ai_usage_cost"), "{body}");
        assert!(!body.contains("gen_ai_total_requests"), "{body}");
    }

    #[test]
    fn both_paths_emit_independently() {
        let mut exposition = Exposition::default();
        let semconv = Path::new(Origin::OpenTelemetry, &NamingConvention::GEN_AI, &mut exposition);
        let legacy = Path::new(Origin::OpenLit, &NamingConvention::LEGACY, &mut exposition);

        let recorders = Recorders::new(vec![semconv.recorder.clone(), legacy.recorder.clone()]);
        assert_eq!(recorders.origins(), vec![Origin::OpenTelemetry, Origin::OpenLit]);

        recorders.record_operation(&chat("gpt-4", "gpt-4", 10, 20));

        assert_eq!(semconv.finished_spans()[0].name, "gen_ai.chat.completions");
        assert_eq!(legacy.finished_spans()[0].name, "openai.chat");

        let body = exposition.render();

        assert!(body.contains(r#"telemetry_sdk_name="opentelemetry""#), "{body}");
        assert!(body.contains(r#"telemetry_sdk_name="openlit""#), "{body}");
        assert!(body.contains("llm_usage_prompt_tokens_total{"), "{body}");
        assert!(body.contains("gen_ai_usage_input_tokens_total{"), "{body}");
    }

    struct Panicking {
        calls: AtomicUsize,
    }

    impl Recorder for Panicking {
        fn origin(&self) -> Origin {
            Origin::OpenLit
        }

        fn record_operation(&self, _: &OperationRecord) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            panic!("exporter exploded");
        }

        fn record_evaluation(&self, _: &EvaluationRecord) {
            panic!("exporter exploded");
        }

        fn request_started(&self, _: &RequestRecord) {
            panic!("exporter exploded");
        }

        fn record_request(&self, _: &RequestRecord) {
            panic!("exporter exploded");
        }
    }

    #[test]
    fn failing_recorder_does_not_stop_others() {
        let mut exposition = Exposition::default();
        let path = Path::new(Origin::OpenTelemetry, &NamingConvention::GEN_AI, &mut exposition);
        let panicking = Arc::new(Panicking {
            calls: AtomicUsize::new(0),
        });

        let recorders = Recorders::new(vec![panicking.clone(), path.recorder.clone()]);
        recorders.record_operation(&chat("gpt-4", "gpt-4", 1, 1));

        assert_eq!(panicking.calls.load(Ordering::SeqCst), 1);
        assert_eq!(path.finished_spans().len(), 1);
    }

    #[test]
    fn concurrent_operations_keep_their_attributes() {
        let mut exposition = Exposition::default();
        let path = Path::new(Origin::OpenTelemetry, &NamingConvention::GEN_AI, &mut exposition);
        let recorders = Recorders::new(vec![path.recorder.clone()]);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let recorders = recorders.clone();
                scope.spawn(move || {
                    recorders.record_operation(&chat("gpt-4", "gpt-4-0613", 10, 20));
                    recorders.record_operation(&chat("gpt-3.5-turbo", "gpt-3.5-turbo-0125", 30, 40));
                });
            }
        });

        let spans = path.finished_spans();
        assert_eq!(spans.len(), 16);

        for span in &spans {
            let request = attribute(span, "gen_ai.request.model").unwrap().to_string();
            let response = attribute(span, "gen_ai.response.model").unwrap().to_string();
            let input = attribute(span, "gen_ai.usage.input_tokens").unwrap();

            match request.as_str() {
                "gpt-4" => {
                    assert_eq!(response, "gpt-4-0613");
                    assert_eq!(input, &Value::I64(10));
                }
                "gpt-3.5-turbo" => {
                    assert_eq!(response, "gpt-3.5-turbo-0125");
                    assert_eq!(input, &Value::I64(30));
                }
                other => panic!("unexpected model {other}"),
            }
        }

        let body = exposition.render();

        let labels = [
            r#"gen_ai_operation_name="chat""#,
            r#"gen_ai_request_model="gpt-4""#,
            r#"gen_ai_response_model="gpt-4-0613""#,
            r#"gen_ai_system="openai""#,
            r#"status="success""#,
            r#"telemetry_sdk_name="opentelemetry""#,
            r#"user_id="unknown""#,
        ];

        assert_eq!(
            sample_value(&body, "gen_ai_usage_input_tokens_total", &labels),
            Some(80.0),
            "{body}"
        );
    }

    #[test]
    fn served_requests_emit_server_spans_and_balance_active_requests() {
        let mut exposition = Exposition::default();
        let path = Path::new(Origin::OpenTelemetry, &NamingConvention::GEN_AI, &mut exposition);
        let recorders = Recorders::new(vec![path.recorder.clone()]);

        let mut record = RequestRecord::new("POST", "/v1/embeddings", "req-7");
        recorders.request_started(&record);

        let body = exposition.render();
        let route = [r#"http_request_method="POST""#, r#"http_route="/v1/embeddings""#];

        assert_eq!(sample_value(&body, "http_server_active_requests", &route), Some(1.0), "{body}");

        record.status_code = 500;
        record.duration = Duration::from_millis(15);
        recorders.record_request(&record);

        let spans = path.finished_spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "POST /v1/embeddings");
        assert_eq!(spans[0].span_kind, SpanKind::Server);
        assert_eq!(spans[0].status, Status::error("HTTP 500"));
        assert_eq!(attribute(&spans[0], "request.id"), Some(&Value::from("req-7")));

        let body = exposition.render();
        let served = [
            r#"http_request_method="POST""#,
            r#"http_route="/v1/embeddings""#,
            r#"http_response_status_code="500""#,
        ];

        assert_eq!(sample_value(&body, "http_server_active_requests", &route), Some(0.0), "{body}");
        assert_eq!(
            sample_value(&body, "http_server_request_count_total", &served),
            Some(1.0),
            "{body}"
        );
        assert_eq!(
            sample_value(&body, "http_server_request_duration_seconds_count", &served),
            Some(1.0),
            "{body}"
        );
    }
}
