//! Pull-based metrics exposition in the Prometheus text format.
//!
//! Every instrumentation path attaches a [`PrometheusExporter`] reader backed by its own
//! registry. A scrape collects all paths on demand and merges their families by name.

use std::collections::{BTreeMap, HashSet, btree_map::Entry};

use opentelemetry::Key;
use opentelemetry_prometheus::{PrometheusExporter, ResourceSelector};
use prometheus::{Registry, TextEncoder, proto::MetricFamily};

use crate::attributes::TELEMETRY_SDK_NAME;

pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Registries of every path feeding the scrape endpoint.
#[derive(Clone, Default)]
pub struct Exposition {
    registries: Vec<Registry>,
}

impl Exposition {
    /// A metric reader for one more path. Attach it to that path's meter provider.
    ///
    /// Only `telemetry.sdk.name` is projected from the resource onto the samples, which is
    /// what tells the two paths apart on a shared endpoint.
    pub fn reader(&mut self) -> anyhow::Result<PrometheusExporter> {
        let registry = Registry::new();

        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .without_target_info()
            .without_scope_info()
            .with_resource_selector(ResourceSelector::KeyAllowList(HashSet::from([Key::from_static_str(
                TELEMETRY_SDK_NAME,
            )])))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create Prometheus exporter: {e}"))?;

        self.registries.push(registry);

        Ok(exporter)
    }

    /// Collects every path and encodes the result. Families sharing a name are merged.
    pub fn render(&self) -> String {
        let mut merged: BTreeMap<String, MetricFamily> = BTreeMap::new();

        for registry in &self.registries {
            for mut family in registry.gather() {
                match merged.entry(family.name().to_string()) {
                    Entry::Vacant(entry) => {
                        entry.insert(family);
                    }
                    Entry::Occupied(mut entry) => {
                        let metrics = family.take_metric();
                        entry.get_mut().mut_metric().extend(metrics);
                    }
                }
            }
        }

        let families: Vec<MetricFamily> = merged.into_values().collect();
        let mut body = String::new();

        if let Err(e) = TextEncoder::new().encode_utf8(&families, &mut body) {
            log::error!("Failed to encode Prometheus metrics: {e}");
        }

        body
    }
}

/// Value of the sample `name` carrying every one of `labels`, in any label order.
#[cfg(test)]
pub(crate) fn sample_value(body: &str, name: &str, labels: &[&str]) -> Option<f64> {
    body.lines().find_map(|line| {
        let (series, value) = line.rsplit_once(' ')?;

        let series_labels = match series.split_once('{') {
            Some((series_name, rest)) if series_name == name => rest.strip_suffix('}')?,
            None if series == name => "",
            _ => return None,
        };

        let parts: Vec<&str> = series_labels.split(',').collect();

        if labels.iter().all(|label| parts.contains(label)) {
            value.parse().ok()
        } else {
            None
        }
    })
}
