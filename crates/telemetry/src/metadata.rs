//! Headers and TLS settings shared by the OTLP span and metric exporters.

use std::collections::HashMap;

use config::OtlpExporterConfig;
use opentelemetry_otlp::tonic_types::{
    metadata::MetadataMap,
    transport::{Certificate, ClientTlsConfig, Identity},
};

/// gRPC metadata from the configured headers. Header names were validated while loading the configuration.
pub(crate) fn build_metadata(config: &OtlpExporterConfig) -> MetadataMap {
    if config.headers.is_empty() {
        return MetadataMap::new();
    }

    let mut header_map = http::HeaderMap::new();

    for (name, value) in config.headers.iter() {
        header_map.insert(name.clone(), value.clone());
    }

    MetadataMap::from_headers(header_map)
}

pub(crate) fn build_http_headers(config: &OtlpExporterConfig) -> anyhow::Result<HashMap<String, String>> {
    let mut headers = HashMap::new();

    for (name, value) in config.headers.iter() {
        let header_name = name.as_str().to_string();
        let header_value = value
            .to_str()
            .map_err(|_| anyhow::anyhow!("Header value contains non-UTF8 characters for key: {header_name}"))?
            .to_string();

        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

pub(crate) fn build_tls_config(config: &OtlpExporterConfig) -> anyhow::Result<Option<ClientTlsConfig>> {
    let Some(tls_config) = &config.tls else {
        return Ok(None);
    };

    let mut client_tls = ClientTlsConfig::new();

    if let Some(domain_name) = &tls_config.domain_name {
        client_tls = client_tls.domain_name(domain_name.clone());
    }

    if let Some(ca_path) = &tls_config.ca {
        let ca_cert = std::fs::read_to_string(ca_path)
            .map_err(|e| anyhow::anyhow!("Failed to read CA certificate from {ca_path}: {e}"))?;

        client_tls = client_tls.ca_certificate(Certificate::from_pem(ca_cert));
    }

    if let Some(key_path) = &tls_config.key
        && let Some(cert_path) = &tls_config.cert
    {
        let key = std::fs::read_to_string(key_path)
            .map_err(|e| anyhow::anyhow!("Failed to read client key from {key_path}: {e}"))?;

        let cert = std::fs::read_to_string(cert_path)
            .map_err(|e| anyhow::anyhow!("Failed to read client certificate from {cert_path}: {e}"))?;

        client_tls = client_tls.identity(Identity::from_pem(cert, key));
    }

    Ok(Some(client_tls))
}
