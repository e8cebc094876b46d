//! Origin tagging: every signal a path emits carries its `telemetry.sdk.name` on the resource.

use config::TelemetryConfig;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

pub use config::Origin;

use crate::attributes::{DEPLOYMENT_ENVIRONMENT_NAME, TELEMETRY_SDK_NAME};

/// Resource shared by the tracer and meter providers of one instrumentation path.
///
/// Custom resource attributes are applied before the origin so a configured
/// `telemetry.sdk.name` can never mask which path produced the data.
pub fn build_resource(config: &TelemetryConfig, origin: Origin) -> Resource {
    let mut builder = Resource::builder()
        .with_service_name(config.service_name().to_string())
        .with_attribute(KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
            config.service_version().to_string(),
        ))
        .with_attribute(KeyValue::new(
            DEPLOYMENT_ENVIRONMENT_NAME,
            config.deployment_environment().to_string(),
        ));

    for (key, value) in config.resource_attributes() {
        builder = builder.with_attribute(KeyValue::new(key.clone(), value.clone()));
    }

    builder
        .with_attribute(KeyValue::new(TELEMETRY_SDK_NAME, origin.as_str()))
        .build()
}
