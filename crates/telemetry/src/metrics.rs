//! Metric registry: every instrument the recorders update, its unit and its bucket layout.
//!
//! Units other than seconds are curly-brace annotations so Prometheus names stay free of unit
//! suffixes, e.g. `gen_ai.client.token.usage` in `{token}` scrapes as `gen_ai_client_token_usage`.

pub mod names;

use std::{collections::HashMap, sync::OnceLock};

use anyhow::Context;
use config::{OtlpProtocol, TelemetryConfig};
use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Histogram, Meter, MeterProvider as _, UpDownCounter},
};
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_prometheus::PrometheusExporter;
use opentelemetry_sdk::{
    Resource,
    metrics::{Aggregation, Instrument as SdkInstrument, PeriodicReader, SdkMeterProvider, Stream},
};

use crate::{
    convention::{Measurement, NamingConvention},
    metadata,
};

/// Doubling from 10ms up to ~82s.
pub const OPERATION_DURATION_BUCKETS: &[f64] = &[
    0.01, 0.02, 0.04, 0.08, 0.16, 0.32, 0.64, 1.28, 2.56, 5.12, 10.24, 20.48, 40.96, 81.92,
];

/// Powers of four from 1 up to 67,108,864 tokens.
pub const TOKEN_USAGE_BUCKETS: &[f64] = &[
    1.0,
    4.0,
    16.0,
    64.0,
    256.0,
    1024.0,
    4096.0,
    16384.0,
    65536.0,
    262144.0,
    1048576.0,
    4194304.0,
    16777216.0,
    67108864.0,
];

pub const TIME_TO_FIRST_TOKEN_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.02, 0.04, 0.06, 0.08, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

pub const TIME_PER_OUTPUT_TOKEN_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.4, 0.5, 0.75, 1.0, 2.5,
];

pub const EVAL_SCORE_BUCKETS: &[f64] = &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    UpDownCounter,
    Histogram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    U64,
    I64,
    F64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    U64(u64),
    I64(i64),
    F64(f64),
}

/// Static description of one instrument. Names come from the path's naming convention.
#[derive(Debug)]
pub struct MetricDefinition {
    pub measurement: Measurement,
    pub kind: MetricKind,
    pub value_type: ValueType,
    pub unit: &'static str,
    pub description: &'static str,
    /// Explicit histogram boundaries. `None` keeps the SDK default aggregation.
    pub boundaries: Option<&'static [f64]>,
}

static OPERATION_DURATION: MetricDefinition = MetricDefinition {
    measurement: Measurement::OperationDuration,
    kind: MetricKind::Histogram,
    value_type: ValueType::F64,
    unit: "s",
    description: "GenAI operation duration",
    boundaries: Some(OPERATION_DURATION_BUCKETS),
};

static TOKEN_USAGE: MetricDefinition = MetricDefinition {
    measurement: Measurement::TokenUsage,
    kind: MetricKind::Histogram,
    value_type: ValueType::U64,
    unit: "{token}",
    description: "Measures number of input and output tokens used",
    boundaries: Some(TOKEN_USAGE_BUCKETS),
};

static OPERATION_COUNT: MetricDefinition = MetricDefinition {
    measurement: Measurement::OperationCount,
    kind: MetricKind::Counter,
    value_type: ValueType::U64,
    unit: "{operation}",
    description: "Number of GenAI operations by outcome",
    boundaries: None,
};

static OPERATION_COST: MetricDefinition = MetricDefinition {
    measurement: Measurement::OperationCost,
    kind: MetricKind::Counter,
    value_type: ValueType::F64,
    unit: "{USD}",
    description: "Accumulated estimated cost of GenAI operations",
    boundaries: None,
};

static TOTAL_REQUESTS: MetricDefinition = MetricDefinition {
    measurement: Measurement::TotalRequests,
    kind: MetricKind::Counter,
    value_type: ValueType::U64,
    unit: "{request}",
    description: "Number of successful requests to GenAI providers",
    boundaries: None,
};

static INPUT_TOKENS: MetricDefinition = MetricDefinition {
    measurement: Measurement::InputTokens,
    kind: MetricKind::Counter,
    value_type: ValueType::U64,
    unit: "{token}",
    description: "Number of input tokens consumed",
    boundaries: None,
};

static OUTPUT_TOKENS: MetricDefinition = MetricDefinition {
    measurement: Measurement::OutputTokens,
    kind: MetricKind::Counter,
    value_type: ValueType::U64,
    unit: "{token}",
    description: "Number of output tokens produced",
    boundaries: None,
};

static COST_DISTRIBUTION: MetricDefinition = MetricDefinition {
    measurement: Measurement::CostDistribution,
    kind: MetricKind::Histogram,
    value_type: ValueType::F64,
    unit: "{USD}",
    description: "Distribution of estimated cost per operation",
    boundaries: None,
};

static TIME_PER_OUTPUT_TOKEN: MetricDefinition = MetricDefinition {
    measurement: Measurement::TimePerOutputToken,
    kind: MetricKind::Histogram,
    value_type: ValueType::F64,
    unit: "s",
    description: "Time per output token generated after the first token",
    boundaries: Some(TIME_PER_OUTPUT_TOKEN_BUCKETS),
};

static TIME_TO_FIRST_TOKEN: MetricDefinition = MetricDefinition {
    measurement: Measurement::TimeToFirstToken,
    kind: MetricKind::Histogram,
    value_type: ValueType::F64,
    unit: "s",
    description: "Time to generate the first token for successful responses",
    boundaries: Some(TIME_TO_FIRST_TOKEN_BUCKETS),
};

static EVAL_SCORE: MetricDefinition = MetricDefinition {
    measurement: Measurement::EvalScore,
    kind: MetricKind::Histogram,
    value_type: ValueType::F64,
    unit: "{score}",
    description: "Evaluation score between 0 and 1",
    boundaries: Some(EVAL_SCORE_BUCKETS),
};

static EVAL_PASSED: MetricDefinition = MetricDefinition {
    measurement: Measurement::EvalPassed,
    kind: MetricKind::Counter,
    value_type: ValueType::U64,
    unit: "{evaluation}",
    description: "Number of passed evaluations",
    boundaries: None,
};

static EVAL_FAILED: MetricDefinition = MetricDefinition {
    measurement: Measurement::EvalFailed,
    kind: MetricKind::Counter,
    value_type: ValueType::U64,
    unit: "{evaluation}",
    description: "Number of failed evaluations",
    boundaries: None,
};

static EVAL_DURATION: MetricDefinition = MetricDefinition {
    measurement: Measurement::EvalDuration,
    kind: MetricKind::Histogram,
    value_type: ValueType::F64,
    unit: "s",
    description: "Time spent evaluating a response",
    boundaries: Some(OPERATION_DURATION_BUCKETS),
};

static HTTP_REQUEST_DURATION: MetricDefinition = MetricDefinition {
    measurement: Measurement::HttpRequestDuration,
    kind: MetricKind::Histogram,
    value_type: ValueType::F64,
    unit: "s",
    description: "HTTP request duration",
    boundaries: None,
};

static HTTP_REQUEST_COUNT: MetricDefinition = MetricDefinition {
    measurement: Measurement::HttpRequestCount,
    kind: MetricKind::Counter,
    value_type: ValueType::U64,
    unit: "{request}",
    description: "Total HTTP requests",
    boundaries: None,
};

static HTTP_ACTIVE_REQUESTS: MetricDefinition = MetricDefinition {
    measurement: Measurement::HttpActiveRequests,
    kind: MetricKind::UpDownCounter,
    value_type: ValueType::I64,
    unit: "{request}",
    description: "Active HTTP requests",
    boundaries: None,
};

pub fn definition(measurement: Measurement) -> &'static MetricDefinition {
    match measurement {
        Measurement::OperationDuration => &OPERATION_DURATION,
        Measurement::TokenUsage => &TOKEN_USAGE,
        Measurement::OperationCount => &OPERATION_COUNT,
        Measurement::OperationCost => &OPERATION_COST,
        Measurement::TotalRequests => &TOTAL_REQUESTS,
        Measurement::InputTokens => &INPUT_TOKENS,
        Measurement::OutputTokens => &OUTPUT_TOKENS,
        Measurement::CostDistribution => &COST_DISTRIBUTION,
        Measurement::TimePerOutputToken => &TIME_PER_OUTPUT_TOKEN,
        Measurement::TimeToFirstToken => &TIME_TO_FIRST_TOKEN,
        Measurement::EvalScore => &EVAL_SCORE,
        Measurement::EvalPassed => &EVAL_PASSED,
        Measurement::EvalFailed => &EVAL_FAILED,
        Measurement::EvalDuration => &EVAL_DURATION,
        Measurement::HttpRequestDuration => &HTTP_REQUEST_DURATION,
        Measurement::HttpRequestCount => &HTTP_REQUEST_COUNT,
        Measurement::HttpActiveRequests => &HTTP_ACTIVE_REQUESTS,
    }
}

#[derive(Clone)]
enum Instrument {
    U64Counter(Counter<u64>),
    F64Counter(Counter<f64>),
    I64UpDownCounter(UpDownCounter<i64>),
    U64Histogram(Histogram<u64>),
    F64Histogram(Histogram<f64>),
}

impl Instrument {
    fn build(meter: &Meter, name: &'static str, definition: &MetricDefinition) -> Self {
        match (definition.kind, definition.value_type) {
            (MetricKind::Counter, ValueType::U64) => Instrument::U64Counter(
                meter
                    .u64_counter(name)
                    .with_unit(definition.unit)
                    .with_description(definition.description)
                    .build(),
            ),
            (MetricKind::Counter, _) => Instrument::F64Counter(
                meter
                    .f64_counter(name)
                    .with_unit(definition.unit)
                    .with_description(definition.description)
                    .build(),
            ),
            (MetricKind::UpDownCounter, _) => Instrument::I64UpDownCounter(
                meter
                    .i64_up_down_counter(name)
                    .with_unit(definition.unit)
                    .with_description(definition.description)
                    .build(),
            ),
            (MetricKind::Histogram, ValueType::U64) => Instrument::U64Histogram(
                meter
                    .u64_histogram(name)
                    .with_unit(definition.unit)
                    .with_description(definition.description)
                    .build(),
            ),
            (MetricKind::Histogram, _) => Instrument::F64Histogram(
                meter
                    .f64_histogram(name)
                    .with_unit(definition.unit)
                    .with_description(definition.description)
                    .build(),
            ),
        }
    }

    fn record(&self, value: MetricValue, attributes: &[KeyValue]) {
        match (self, value) {
            (Instrument::U64Counter(counter), MetricValue::U64(value)) => counter.add(value, attributes),
            (Instrument::F64Counter(counter), MetricValue::F64(value)) => counter.add(value, attributes),
            (Instrument::U64Histogram(histogram), MetricValue::U64(value)) => histogram.record(value, attributes),
            (Instrument::F64Histogram(histogram), MetricValue::F64(value)) => histogram.record(value, attributes),
            (Instrument::F64Counter(counter), MetricValue::U64(value)) => counter.add(value as f64, attributes),
            (Instrument::F64Histogram(histogram), MetricValue::U64(value)) => {
                histogram.record(value as f64, attributes)
            }
            (Instrument::I64UpDownCounter(counter), MetricValue::I64(value)) => counter.add(value, attributes),
            (_, value) => {
                log::debug!("Dropping {value:?} recorded against an instrument of another value type");
            }
        }
    }
}

/// Instruments of one path, created together against one meter.
pub struct Instruments {
    by_measurement: HashMap<Measurement, Instrument>,
}

impl Instruments {
    fn new(meter: &Meter, convention: &NamingConvention) -> Self {
        let by_measurement = Measurement::ALL
            .into_iter()
            .map(|measurement| {
                let name = convention.metric(measurement);
                (measurement, Instrument::build(meter, name, definition(measurement)))
            })
            .collect();

        Self { by_measurement }
    }

    pub fn record(&self, measurement: Measurement, value: MetricValue, attributes: &[KeyValue]) {
        if let Some(instrument) = self.by_measurement.get(&measurement) {
            instrument.record(value, attributes);
        }
    }
}

/// Registry lifecycle: uninitialised until the first [`MetricRegistry::register`],
/// registered afterwards. Registering again hands back the same instruments.
pub struct MetricRegistry {
    convention: &'static NamingConvention,
    instruments: OnceLock<Instruments>,
}

impl MetricRegistry {
    pub fn new(convention: &'static NamingConvention) -> Self {
        Self {
            convention,
            instruments: OnceLock::new(),
        }
    }

    pub fn convention(&self) -> &'static NamingConvention {
        self.convention
    }

    pub fn register(&self, meter: &Meter) -> &Instruments {
        self.instruments.get_or_init(|| {
            log::debug!("Registering {} metric instruments", self.convention.name());
            Instruments::new(meter, self.convention)
        })
    }

    pub fn instruments(&self) -> Option<&Instruments> {
        self.instruments.get()
    }

    pub fn is_registered(&self) -> bool {
        self.instruments.get().is_some()
    }

    pub fn boundaries(&self, measurement: Measurement) -> Option<&'static [f64]> {
        definition(measurement).boundaries
    }

    /// Pins explicit bucket boundaries on every histogram of this registry that declares them.
    pub fn bucket_view(&self) -> impl Fn(&SdkInstrument) -> Option<Stream> + Send + Sync + 'static {
        let buckets: Vec<(&'static str, &'static [f64])> = Measurement::ALL
            .into_iter()
            .filter_map(|measurement| {
                let definition = definition(measurement);

                match (definition.kind, definition.boundaries) {
                    (MetricKind::Histogram, Some(boundaries)) => Some((self.convention.metric(measurement), boundaries)),
                    _ => None,
                }
            })
            .collect();

        move |instrument: &SdkInstrument| {
            let (_, boundaries) = buckets.iter().find(|(name, _)| *name == instrument.name())?;

            let aggregation = Aggregation::ExplicitBucketHistogram {
                boundaries: boundaries.to_vec(),
                record_min_max: false,
            };

            Stream::builder().with_aggregation(aggregation).build().ok()
        }
    }
}

pub(crate) fn meter(provider: &SdkMeterProvider) -> Meter {
    let scope = InstrumentationScope::builder("lantern")
        .with_version(env!("CARGO_PKG_VERSION"))
        .build();

    provider.meter_with_scope(scope)
}

/// Create the meter provider of one instrumentation path.
pub(crate) fn create_meter_provider(
    telemetry_config: &TelemetryConfig,
    resource: Resource,
    registry: &MetricRegistry,
    exposition: Option<PrometheusExporter>,
) -> anyhow::Result<SdkMeterProvider> {
    let mut builder = SdkMeterProvider::builder()
        .with_resource(resource)
        .with_view(registry.bucket_view());

    let mut exporter_configured = false;

    if let Some(exporter_config) = telemetry_config.otlp() {
        let protocol = exporter_config.effective_protocol();
        let endpoint = exporter_config.metrics_endpoint();

        log::debug!("Initializing OTLP metrics exporter to {endpoint} via {protocol:?}");

        let exporter: MetricExporter = match protocol {
            OtlpProtocol::Grpc => {
                use opentelemetry_otlp::WithTonicConfig;

                let mut builder = MetricExporter::builder()
                    .with_tonic()
                    .with_endpoint(endpoint.as_str())
                    .with_timeout(exporter_config.timeout);

                if let Some(tls_config) = metadata::build_tls_config(exporter_config)? {
                    builder = builder.with_tls_config(tls_config);
                }

                builder = builder.with_metadata(metadata::build_metadata(exporter_config));

                builder.build().context("Failed to create gRPC OTLP metric exporter")?
            }
            OtlpProtocol::Http => {
                use opentelemetry_otlp::WithHttpConfig;

                let headers = metadata::build_http_headers(exporter_config)?;

                MetricExporter::builder()
                    .with_http()
                    .with_endpoint(endpoint.as_str())
                    .with_timeout(exporter_config.timeout)
                    .with_headers(headers)
                    .build()
                    .context("Failed to create HTTP OTLP metric exporter")?
            }
        };

        let reader = PeriodicReader::builder(exporter)
            .with_interval(exporter_config.batch_export.scheduled_delay)
            .build();

        builder = builder.with_reader(reader);
        exporter_configured = true;
    }

    if let Some(reader) = exposition {
        log::debug!("Attaching Prometheus reader, metrics are collected on scrape");

        builder = builder.with_reader(reader);
        exporter_configured = true;
    }

    if !exporter_configured {
        log::debug!("No metrics exporters configured or enabled, metrics will not be exported");
    }

    Ok(builder.build())
}
