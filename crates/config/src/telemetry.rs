use std::collections::BTreeMap;

use serde::Deserialize;

mod env;
pub mod exporters;

pub use self::env::parse_otlp_headers;
pub use self::exporters::{ExportersConfig, OtlpExporterConfig, OtlpHeaders, OtlpProtocol, PrometheusConfig};

const DEFAULT_SERVICE_NAME: &str = "ai-observability-demo";
const DEFAULT_SERVICE_VERSION: &str = "1.0.0";
const DEFAULT_DEPLOYMENT_ENVIRONMENT: &str = "demo";

/// Telemetry configuration for observability
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Service name for telemetry identification
    service_name: Option<String>,

    /// Service version reported as `service.version`
    service_version: Option<String>,

    /// Reported as `deployment.environment.name`
    deployment_environment: Option<String>,

    /// Custom resource attributes to attach to all telemetry
    resource_attributes: BTreeMap<String, String>,

    /// Where telemetry is sent
    exporters: ExportersConfig,
}

impl TelemetryConfig {
    pub fn service_name(&self) -> &str {
        self.service_name.as_deref().unwrap_or(DEFAULT_SERVICE_NAME)
    }

    pub fn service_version(&self) -> &str {
        self.service_version.as_deref().unwrap_or(DEFAULT_SERVICE_VERSION)
    }

    pub fn deployment_environment(&self) -> &str {
        self.deployment_environment
            .as_deref()
            .unwrap_or(DEFAULT_DEPLOYMENT_ENVIRONMENT)
    }

    /// Get the resource attributes
    pub fn resource_attributes(&self) -> &BTreeMap<String, String> {
        &self.resource_attributes
    }

    pub fn exporters(&self) -> &ExportersConfig {
        &self.exporters
    }

    /// The OTLP exporter, if enabled.
    pub fn otlp(&self) -> Option<&OtlpExporterConfig> {
        self.exporters.otlp.enabled.then_some(&self.exporters.otlp)
    }

    /// The Prometheus exposition, if enabled.
    pub fn prometheus(&self) -> Option<&PrometheusConfig> {
        self.exporters.prometheus.enabled.then_some(&self.exporters.prometheus)
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if let Some(otlp) = self.otlp() {
            otlp.validate()?;
        }

        if let Some(prometheus) = self.prometheus()
            && !prometheus.path.starts_with('/')
        {
            return Err(crate::Error::Validation(format!(
                "prometheus path must start with '/', got '{}'",
                prometheus.path
            )));
        }

        Ok(())
    }
}
