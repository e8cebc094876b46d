//! Cost estimation from per-model token prices.

use std::collections::BTreeMap;

use config::{ModelPricing, PricingConfig};

/// Estimated USD cost of one operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cost {
    Estimated(f64),
    /// The model has no price entry. No cost is recorded for the operation.
    UnknownModel,
}

impl Cost {
    pub fn usd(self) -> Option<f64> {
        match self {
            Cost::Estimated(usd) => Some(usd),
            Cost::UnknownModel => None,
        }
    }
}

/// Prices in USD per 1,000 tokens, keyed by model name.
#[derive(Debug, Clone)]
pub struct PriceTable {
    models: BTreeMap<String, ModelPricing>,
}

impl PriceTable {
    pub fn new(config: &PricingConfig) -> Self {
        Self {
            models: config.models.clone(),
        }
    }

    pub fn price(&self, model: &str) -> Option<&ModelPricing> {
        self.models.get(model)
    }

    pub fn estimate(&self, model: &str, input_tokens: u64, output_tokens: u64) -> Cost {
        let Some(pricing) = self.models.get(model) else {
            log::warn!("No pricing configured for model '{model}', cost will not be recorded");
            return Cost::UnknownModel;
        };

        let input = input_tokens as f64 / 1000.0 * pricing.input;
        let output = output_tokens as f64 / 1000.0 * pricing.output;

        Cost::Estimated(input + output)
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new(&PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(cost: Cost, expected: f64) {
        let usd = cost.usd().unwrap();
        assert!((usd - expected).abs() < 1e-12, "{usd} != {expected}");
    }

    #[test]
    fn chat_cost() {
        let prices = PriceTable::default();
        assert_close(prices.estimate("gpt-4-turbo-preview", 50, 120), 0.0041);
        assert_close(prices.estimate("gpt-4", 1000, 1000), 0.09);
    }

    #[test]
    fn embedding_cost_ignores_output() {
        let prices = PriceTable::default();
        assert_close(prices.estimate("text-embedding-ada-002", 2000, 0), 0.0002);
    }

    #[test]
    fn zero_tokens_cost_nothing() {
        assert_eq!(PriceTable::default().estimate("gpt-3.5-turbo", 0, 0), Cost::Estimated(0.0));
    }

    #[test]
    fn unknown_model() {
        let cost = PriceTable::default().estimate("llama-3-70b", 10, 10);

        assert_eq!(cost, Cost::UnknownModel);
        assert_eq!(cost.usd(), None);
    }

    #[test]
    fn configured_prices() {
        let config = config::Config::from_toml_with_env(
            "[pricing.models.\"gpt-4o\"]\ninput = 0.005\noutput = 0.015\n",
            |_| None,
        )
        .unwrap();

        let prices = PriceTable::new(&config.pricing);

        assert_close(prices.estimate("gpt-4o", 1000, 2000), 0.035);
        assert!(prices.price("gpt-4").is_none());
    }

    #[test]
    fn cost_never_decreases_with_more_tokens() {
        let config = config::Config::from_toml_with_env(
            "[pricing.models.\"gpt-4o\"]\ninput = 0.005\noutput = 0.015\n",
            |_| None,
        )
        .unwrap();

        let tables = [PriceTable::default(), PriceTable::new(&config.pricing)];
        let counts = [0, 1, 2, 7, 99, 1_000, 4_095, 123_456, 10_000_000];

        for prices in &tables {
            for model in prices.models.keys() {
                for &n in &counts {
                    for &other in &counts {
                        let usd = |input, output| prices.estimate(model, input, output).usd().unwrap();

                        let base = usd(n, other);
                        assert!(base >= 0.0, "{model}: {base}");
                        assert!(usd(n + 1, other) >= base, "{model}: input {n} -> {}", n + 1);

                        let base = usd(other, n);
                        assert!(usd(other, n + 1) >= base, "{model}: output {n} -> {}", n + 1);
                    }
                }
            }
        }
    }
}
