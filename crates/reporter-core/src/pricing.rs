use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{ReporterError, Result};
use crate::models::ModelRates;

/// Share of a session's tokens assumed to be input (prompt) tokens.
///
/// The session ledger only reports a single total per session, so every delta
/// is split 80/20 between input and output before pricing.
pub const INPUT_SHARE: f64 = 0.8;

/// Share of a session's tokens assumed to be output (completion) tokens.
pub const OUTPUT_SHARE: f64 = 0.2;

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Estimate the cost (USD) of `delta_tokens` at the given rates.
///
/// The result is left unrounded; rounding happens only when a report is
/// rendered.
pub fn estimate_cost(delta_tokens: u64, rates: ModelRates) -> f64 {
    let tokens = delta_tokens as f64;
    let input_tokens = tokens * INPUT_SHARE;
    let output_tokens = tokens * OUTPUT_SHARE;

    (input_tokens / TOKENS_PER_MILLION) * rates.input
        + (output_tokens / TOKENS_PER_MILLION) * rates.output
}

/// Model name → rates lookup, loaded fresh on every run.
///
/// Models that are not in the table price at zero rather than failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingTable {
    rates: HashMap<String, ModelRates>,
}

impl PricingTable {
    pub fn new(rates: HashMap<String, ModelRates>) -> Self {
        Self { rates }
    }

    /// Read a pricing table from a JSON file shaped like
    /// `{"model": {"input": 3.0, "output": 15.0}}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReporterError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse a pricing table from its JSON text.
    ///
    /// The document must be a JSON object. Entries that are not valid rates
    /// are skipped with a warning, so those models price at zero.
    pub fn from_json(content: &str) -> Result<Self> {
        let entries: HashMap<String, Value> = serde_json::from_str(content)?;

        let rates = entries
            .into_iter()
            .filter_map(|(model, value)| match serde_json::from_value::<ModelRates>(value) {
                Ok(rates) => Some((model, rates)),
                Err(e) => {
                    tracing::warn!(
                        model = %model,
                        error = %e,
                        "skipping invalid pricing entry"
                    );
                    None
                }
            })
            .collect();
        Ok(Self { rates })
    }

    /// Rates for `model`; unknown models get `{input: 0, output: 0}`.
    pub fn rates_for(&self, model: &str) -> ModelRates {
        self.rates.get(model).copied().unwrap_or_default()
    }

    /// Cost of `delta_tokens` consumed on `model`.
    pub fn cost_for(&self, model: &str, delta_tokens: u64) -> f64 {
        estimate_cost(delta_tokens, self.rates_for(model))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
