//! Standard `OTEL_*` environment variables layered over the file configuration.

use base64::{Engine, engine::general_purpose::STANDARD};
use url::Url;

use super::TelemetryConfig;
use crate::Error;

const SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
const RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
const OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const OTLP_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";
const OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";

impl TelemetryConfig {
    /// Applies the standard OpenTelemetry environment variables. Setting an OTLP
    /// endpoint enables the OTLP exporter.
    pub(crate) fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(service_name) = lookup(SERVICE_NAME) {
            self.service_name = Some(service_name.trim().to_string());
        }

        if let Some(attributes) = lookup(RESOURCE_ATTRIBUTES) {
            for (key, value) in split_pairs(&attributes) {
                self.resource_attributes.insert(key.to_string(), value.to_string());
            }
        }

        let otlp = &mut self.exporters.otlp;

        if let Some(endpoint) = lookup(OTLP_ENDPOINT) {
            otlp.endpoint = Url::parse(endpoint.trim()).map_err(|e| Error::Environment {
                variable: OTLP_ENDPOINT,
                reason: e.to_string(),
            })?;
            otlp.enabled = true;
        }

        if let Some(protocol) = lookup(OTLP_PROTOCOL) {
            otlp.protocol = Some(protocol.parse().map_err(|reason| Error::Environment {
                variable: OTLP_PROTOCOL,
                reason,
            })?);
        }

        if let Some(headers) = lookup(OTLP_HEADERS) {
            for (name, value) in parse_otlp_headers(&headers) {
                otlp.headers
                    .try_insert(&name, &value)
                    .map_err(|reason| Error::Environment {
                        variable: OTLP_HEADERS,
                        reason,
                    })?;
            }
        }

        Ok(())
    }
}

/// Parses `key=value` pairs separated by commas, as found in `OTEL_EXPORTER_OTLP_HEADERS`.
///
/// Quotes around the whole string and around single values are dropped. An
/// `Authorization` header carrying raw `user:token` credentials, with a `Basic`
/// scheme or with no scheme at all, is encoded into a proper `Basic` credential.
pub fn parse_otlp_headers(raw: &str) -> Vec<(String, String)> {
    let raw = raw.trim().trim_matches(|c| c == '\'' || c == '"');

    split_pairs(raw)
        .map(|(key, value)| {
            let value = value.trim_matches(|c| c == '\'' || c == '"');

            let value = if key.eq_ignore_ascii_case("authorization") {
                normalize_authorization(value)
            } else {
                value.to_string()
            };

            (key.to_string(), value)
        })
        .collect()
}

fn normalize_authorization(value: &str) -> String {
    let lowercase = value.to_ascii_lowercase();

    if lowercase.starts_with("basic ") {
        let credentials = value[6..].trim();

        if credentials.contains(':') {
            return format!("Basic {}", STANDARD.encode(credentials));
        }

        return format!("Basic {credentials}");
    }

    if value.contains(':') && !lowercase.starts_with("bearer ") {
        return format!("Basic {}", STANDARD.encode(value));
    }

    value.to_string()
}

fn split_pairs(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(',')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
}
