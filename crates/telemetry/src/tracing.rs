//! Span export over OTLP, batched.

use anyhow::Context;
use config::{OtlpProtocol, TelemetryConfig};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider},
};

use crate::metadata;

/// Create the tracer provider of one instrumentation path.
///
/// Without an enabled OTLP exporter the provider still records spans, it just has
/// nowhere to send them.
pub(crate) fn create_tracer_provider(config: &TelemetryConfig, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let mut builder = SdkTracerProvider::builder().with_resource(resource);

    let Some(otlp_config) = config.otlp() else {
        log::debug!("No OTLP exporter enabled, spans will not be exported");
        return Ok(builder.build());
    };

    let endpoint = otlp_config.traces_endpoint();
    let protocol = otlp_config.effective_protocol();

    log::debug!("Creating OTLP span exporter with endpoint: {endpoint}, protocol: {protocol:?}");

    let exporter = match protocol {
        OtlpProtocol::Grpc => {
            use opentelemetry_otlp::WithTonicConfig;

            let mut builder = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint.as_str())
                .with_timeout(otlp_config.timeout)
                .with_metadata(metadata::build_metadata(otlp_config));

            if let Some(tls_config) = metadata::build_tls_config(otlp_config)? {
                builder = builder.with_tls_config(tls_config);
            }

            builder.build().context("Failed to build gRPC OTLP span exporter")?
        }
        OtlpProtocol::Http => {
            use opentelemetry_otlp::WithHttpConfig;

            SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint.as_str())
                .with_timeout(otlp_config.timeout)
                .with_headers(metadata::build_http_headers(otlp_config)?)
                .build()
                .context("Failed to build HTTP OTLP span exporter")?
        }
    };

    let batch = &otlp_config.batch_export;

    let batch_config = BatchConfigBuilder::default()
        .with_scheduled_delay(batch.scheduled_delay)
        .with_max_queue_size(batch.max_queue_size)
        .with_max_export_batch_size(batch.max_export_batch_size)
        .build();

    let processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    builder = builder.with_span_processor(processor);

    Ok(builder.build())
}
