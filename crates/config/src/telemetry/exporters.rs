use duration_str::deserialize_duration;
use http::{HeaderName, HeaderValue};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Exporters configuration for telemetry
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ExportersConfig {
    /// OTLP exporter configuration
    pub otlp: OtlpExporterConfig,

    /// Pull-based metrics exposition
    pub prometheus: PrometheusConfig,
}

/// OTLP exporter configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OtlpExporterConfig {
    /// Whether this exporter is enabled
    pub enabled: bool,

    /// OTLP endpoint URL
    pub endpoint: Url,

    /// OTLP protocol selection. Detected from the endpoint when not set.
    pub protocol: Option<OtlpProtocol>,

    /// Request timeout
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// Batch export configuration
    pub batch_export: BatchExportConfig,

    /// Headers sent with every export, as HTTP headers or gRPC metadata
    pub headers: OtlpHeaders,

    /// TLS configuration for gRPC connections
    pub tls: Option<OtlpTlsConfig>,
}

impl Default for OtlpExporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: Url::parse("http://localhost:4317").expect("default URL should be valid"),
            protocol: None,
            timeout: Duration::from_secs(10),
            batch_export: BatchExportConfig::default(),
            headers: OtlpHeaders::default(),
            tls: None,
        }
    }
}

impl OtlpExporterConfig {
    /// The configured protocol, or the one implied by the endpoint shape: a path
    /// containing `/otlp` or `/v1/` means HTTP/protobuf, anything else gRPC.
    pub fn effective_protocol(&self) -> OtlpProtocol {
        if let Some(protocol) = self.protocol {
            return protocol;
        }

        let endpoint = self.endpoint.as_str().to_ascii_lowercase();

        if endpoint.contains("/otlp") || endpoint.contains("/v1/") {
            OtlpProtocol::Http
        } else {
            OtlpProtocol::Grpc
        }
    }

    /// Endpoint for span export.
    pub fn traces_endpoint(&self) -> String {
        self.signal_endpoint("traces")
    }

    /// Endpoint for metric export.
    pub fn metrics_endpoint(&self) -> String {
        self.signal_endpoint("metrics")
    }

    /// HTTP exporters need the full signal path, gRPC exporters only scheme and authority.
    fn signal_endpoint(&self, signal: &str) -> String {
        match self.effective_protocol() {
            OtlpProtocol::Http => {
                let mut base = self.endpoint.as_str().trim_end_matches('/');

                for suffix in ["/v1/traces", "/v1/metrics", "/v1/logs", "/v1"] {
                    if let Some(stripped) = base.strip_suffix(suffix) {
                        base = stripped;
                        break;
                    }
                }

                format!("{base}/v1/{signal}")
            }
            OtlpProtocol::Grpc => {
                let host = self.endpoint.host_str().unwrap_or("localhost");

                match self.endpoint.port() {
                    Some(port) => format!("{}://{host}:{port}", self.endpoint.scheme()),
                    None => format!("{}://{host}", self.endpoint.scheme()),
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.effective_protocol() == OtlpProtocol::Grpc {
            let reserved = self
                .headers
                .iter()
                .map(|(name, _)| name)
                .find(|name| name.as_str().starts_with("grpc-"));

            if let Some(name) = reserved {
                return Err(crate::Error::Validation(format!(
                    "gRPC metadata key cannot start with 'grpc-' (reserved): {name}"
                )));
            }
        } else if self.tls.is_some() {
            return Err(crate::Error::Validation(
                "TLS configuration found but the OTLP protocol is 'http'; use an https endpoint instead".to_string(),
            ));
        }

        Ok(())
    }
}

/// TLS configuration for OTLP gRPC connections
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtlpTlsConfig {
    /// Domain name for TLS verification (SNI)
    pub domain_name: Option<String>,

    /// Path to the client private key PEM file
    pub key: Option<String>,

    /// Path to the client certificate PEM file
    pub cert: Option<String>,

    /// Path to the CA certificate PEM file
    pub ca: Option<String>,
}

/// OTLP protocol selection
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Copy)]
pub enum OtlpProtocol {
    #[serde(rename = "grpc")]
    Grpc,
    #[serde(rename = "http", alias = "http/protobuf")]
    Http,
}

impl std::str::FromStr for OtlpProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grpc" => Ok(OtlpProtocol::Grpc),
            "http" | "http/protobuf" => Ok(OtlpProtocol::Http),
            other => Err(format!("unsupported OTLP protocol '{other}', expected 'grpc' or 'http/protobuf'")),
        }
    }
}

/// Batch export configuration for OTLP
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchExportConfig {
    /// Delay between batch exports
    #[serde(deserialize_with = "deserialize_duration", default = "default_scheduled_delay")]
    pub scheduled_delay: Duration,

    /// Maximum queue size
    pub max_queue_size: usize,

    /// Maximum batch size for export
    pub max_export_batch_size: usize,
}

impl Default for BatchExportConfig {
    fn default() -> Self {
        Self {
            scheduled_delay: default_scheduled_delay(),
            max_queue_size: 2048,
            max_export_batch_size: 512,
        }
    }
}

fn default_scheduled_delay() -> Duration {
    Duration::from_secs(10)
}

/// Metrics exposition in the Prometheus text format, collected on every scrape.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrometheusConfig {
    pub enabled: bool,

    /// Route serving the exposition.
    pub path: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

/// Headers attached to every OTLP export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OtlpHeaders {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl OtlpHeaders {
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds a header, replacing a previous value with the same name.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, value));
    }

    pub(crate) fn try_insert(&mut self, name: &str, value: &str) -> Result<(), String> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| format!("invalid header name '{name}': {e}"))?;
        let value = HeaderValue::from_str(value).map_err(|e| format!("invalid value for header '{name}': {e}"))?;

        self.insert(name, value);

        Ok(())
    }
}

impl<'de> Deserialize<'de> for OtlpHeaders {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = OtlpHeaders;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map or array of headers")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut headers = OtlpHeaders::default();

                while let Some((name, value)) = map.next_entry::<String, String>()? {
                    headers.try_insert(&name, &value).map_err(serde::de::Error::custom)?;
                }

                Ok(headers)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut headers = OtlpHeaders::default();

                while let Some(header) = seq.next_element::<HeaderEntry>()? {
                    headers
                        .try_insert(&header.name, &header.value)
                        .map_err(serde::de::Error::custom)?;
                }

                Ok(headers)
            }
        }

        deserializer.deserialize_any(HeadersVisitor)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct HeaderEntry {
    name: String,
    value: String,
}
