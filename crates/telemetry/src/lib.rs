//! GenAI telemetry for Lantern.
//!
//! Every enabled instrumentation path gets its own tracer and meter provider,
//! tagged with the path's origin. Operations and served HTTP requests are recorded
//! once through [`Recorders`] and fan out to every path.

pub mod attributes;
pub mod convention;
pub mod cost;
pub mod exposition;
mod metadata;
pub mod metrics;
pub mod origin;
pub mod record;
pub mod recorder;
mod tracing;

use std::sync::Arc;

use config::{InstrumentationConfig, TelemetryConfig};
use opentelemetry_sdk::{metrics::SdkMeterProvider, trace::SdkTracerProvider};

pub use convention::{NamingConvention, OperationKind};
pub use cost::{Cost, PriceTable};
pub use exposition::Exposition;
pub use origin::Origin;
pub use record::{
    CLIENT_CLOSED_REQUEST, ErrorInfo, EvaluationRecord, OperationRecord, Outcome, RequestRecord, ServerEndpoint,
    TokenUsage,
};
pub use recorder::{PathRecorder, Recorder, Recorders};

/// Handle given to the instrumented code.
#[derive(Clone)]
pub struct Telemetry {
    recorders: Recorders,
    exposition: Option<Exposition>,
}

impl Telemetry {
    pub fn recorders(&self) -> &Recorders {
        &self.recorders
    }

    /// The scrape endpoint state, if Prometheus exposition is enabled.
    pub fn exposition(&self) -> Option<&Exposition> {
        self.exposition.as_ref()
    }
}

struct PathProviders {
    origin: Origin,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

/// Guard that ensures proper cleanup of telemetry resources
pub struct TelemetryGuard {
    paths: Vec<PathProviders>,
}

impl TelemetryGuard {
    /// Force flush all pending metrics and traces immediately.
    pub fn force_flush(&self) -> anyhow::Result<()> {
        for path in &self.paths {
            path.tracer_provider
                .force_flush()
                .map_err(|e| anyhow::anyhow!("Failed to flush {} traces: {e}", path.origin))?;

            path.meter_provider
                .force_flush()
                .map_err(|e| anyhow::anyhow!("Failed to flush {} metrics: {e}", path.origin))?;
        }

        Ok(())
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = path.tracer_provider.shutdown() {
                log::error!("Failed to shutdown {} tracer provider: {e}", path.origin);
            }

            if let Err(e) = path.meter_provider.shutdown() {
                log::error!("Failed to shutdown {} meter provider: {e}", path.origin);
            }
        }
    }
}

/// Initialize telemetry for every enabled instrumentation path.
///
/// Nothing is installed globally. Keep the guard alive for the lifetime of the
/// application; dropping it flushes and shuts down all providers.
pub async fn init(
    telemetry_config: &TelemetryConfig,
    instrumentation: &InstrumentationConfig,
) -> anyhow::Result<(Telemetry, TelemetryGuard)> {
    let mut exposition = telemetry_config.prometheus().map(|_| Exposition::default());

    let mut enabled = Vec::new();

    if instrumentation.semconv.enabled {
        enabled.push((instrumentation.semconv_origin(), &NamingConvention::GEN_AI));
    }

    if instrumentation.legacy.enabled {
        enabled.push((instrumentation.legacy_origin(), &NamingConvention::LEGACY));
    }

    let mut paths = Vec::with_capacity(enabled.len());
    let mut recorders: Vec<Arc<dyn Recorder>> = Vec::with_capacity(enabled.len());

    for (origin, convention) in enabled {
        log::debug!("Initializing {} instrumentation with origin {origin}", convention.name());

        let resource = origin::build_resource(telemetry_config, origin);
        let tracer_provider = tracing::create_tracer_provider(telemetry_config, resource.clone())?;

        let registry = metrics::MetricRegistry::new(convention);
        let reader = exposition.as_mut().map(Exposition::reader).transpose()?;
        let meter_provider = metrics::create_meter_provider(telemetry_config, resource, &registry, reader)?;

        recorders.push(Arc::new(PathRecorder::new(
            origin,
            registry,
            &tracer_provider,
            &meter_provider,
        )));

        paths.push(PathProviders {
            origin,
            tracer_provider,
            meter_provider,
        });
    }

    let telemetry = Telemetry {
        recorders: Recorders::new(recorders),
        exposition,
    };

    Ok((telemetry, TelemetryGuard { paths }))
}
