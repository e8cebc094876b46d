//! Per-model token prices used for cost estimation.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Price of one model, in USD per 1,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelPricing {
    pub input: f64,
    #[serde(default)]
    pub output: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PricingConfig {
    pub models: BTreeMap<String, ModelPricing>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let models = [
            ("gpt-4-turbo-preview", 0.01, 0.03),
            ("gpt-4", 0.03, 0.06),
            ("gpt-3.5-turbo", 0.001, 0.002),
            ("text-embedding-ada-002", 0.0001, 0.0),
        ]
        .into_iter()
        .map(|(model, input, output)| (model.to_string(), ModelPricing { input, output }))
        .collect();

        Self { models }
    }
}

impl PricingConfig {
    pub(crate) fn validate(&self) -> crate::Result<()> {
        for (model, price) in &self.models {
            for (side, value) in [("input", price.input), ("output", price.output)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(crate::Error::Validation(format!(
                        "pricing for model '{model}' has an invalid {side} price: {value}"
                    )));
                }
            }
        }

        Ok(())
    }
}
