mod error;
mod instrumentation;
mod loader;
mod openai;
mod pricing;
mod server;
mod telemetry;

use std::{path::Path, str::FromStr};

use serde::Deserialize;

pub use error::Error;
pub use instrumentation::{InstrumentationConfig, InstrumentationPathConfig, Origin};
pub use openai::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, OpenAiConfig};
pub use pricing::{ModelPricing, PricingConfig};
pub use server::{HealthConfig, ServerConfig, TlsServerConfig};
pub use telemetry::{
    ExportersConfig, OtlpExporterConfig, OtlpHeaders, OtlpProtocol, PrometheusConfig, TelemetryConfig,
    exporters::{BatchExportConfig, OtlpTlsConfig},
    parse_otlp_headers,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub instrumentation: InstrumentationConfig,
    pub pricing: PricingConfig,
    pub openai: OpenAiConfig,
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Loads the file, expanding `{{ env.NAME }}` placeholders and applying the
    /// `OTEL_*` variables from the process environment.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
        loader::load(path)
    }

    /// Like [`Config::from_str`], resolving every variable through `lookup` instead
    /// of the process environment.
    pub fn from_toml_with_env<F>(content: &str, lookup: F) -> crate::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        loader::parse(content, lookup)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(content: &str) -> crate::Result<Config> {
        loader::parse(content, |name| std::env::var(name).ok())
    }
}

/// Heuristic quality evaluation of chat completions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    pub enabled: bool,
    /// Minimum share of criteria met for an evaluation to pass.
    pub pass_threshold: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pass_threshold: 0.6,
        }
    }
}
