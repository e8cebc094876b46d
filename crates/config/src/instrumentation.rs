//! Which instrumentation paths are active, and how each identifies itself.

use serde::Deserialize;

/// Identifies the instrumentation library that produced a telemetry item.
///
/// Exported as the `telemetry.sdk.name` resource attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Hand-written instrumentation on top of the OpenTelemetry SDK.
    OpenTelemetry,
    /// Library auto-instrumentation in the OpenLIT style.
    OpenLit,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::OpenTelemetry => "opentelemetry",
            Origin::OpenLit => "openlit",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentationConfig {
    /// Standardized `gen_ai.*` naming.
    pub semconv: InstrumentationPathConfig,
    /// Pre-migration `llm.*` naming, as emitted by auto-instrumentation.
    pub legacy: InstrumentationPathConfig,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            semconv: InstrumentationPathConfig::default(),
            legacy: InstrumentationPathConfig {
                enabled: false,
                origin: None,
            },
        }
    }
}

/// A path is enabled as soon as its table is present, unless `enabled = false`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentationPathConfig {
    pub enabled: bool,
    origin: Option<Origin>,
}

impl Default for InstrumentationPathConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: None,
        }
    }
}

impl InstrumentationConfig {
    pub fn semconv_origin(&self) -> Origin {
        self.semconv.origin.unwrap_or(Origin::OpenTelemetry)
    }

    pub fn legacy_origin(&self) -> Origin {
        self.legacy.origin.unwrap_or(Origin::OpenLit)
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if !self.semconv.enabled && !self.legacy.enabled {
            return Err(crate::Error::Validation(
                "at least one of [instrumentation.semconv] or [instrumentation.legacy] must be enabled".to_string(),
            ));
        }

        if self.semconv.enabled && self.legacy.enabled && self.semconv_origin() == self.legacy_origin() {
            return Err(crate::Error::Validation(format!(
                "both instrumentation paths use origin '{}'; enabled paths must be distinguishable",
                self.semconv_origin()
            )));
        }

        Ok(())
    }
}
