use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Read a non-negative token count from JSON; fractional values are truncated.
///
/// Returns `None` for negative, non-finite or non-numeric values.
pub fn parse_token_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
}

/// One session as reported by the upstream ledger on a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session key.
    pub id: String,
    /// Model the session is running on.
    pub model: String,
    /// Tokens consumed by the session since it started.
    pub cumulative_tokens: u64,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, model: impl Into<String>, cumulative_tokens: u64) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            cumulative_tokens,
        }
    }
}

/// Last observed cumulative token count for every session ever seen.
///
/// The snapshot is the baseline that the next run's deltas are measured
/// against. It is replaced as a whole after every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// When the snapshot was taken; `None` for an empty snapshot.
    pub timestamp: Option<DateTime<Utc>>,
    /// Session id → last seen cumulative tokens.
    pub entries: BTreeMap<String, u64>,
}

impl Snapshot {
    /// Snapshot with no timestamp and no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Last seen cumulative count for `session_id`, or `0` when unseen.
    pub fn last_seen(&self, session_id: &str) -> u64 {
        self.entries.get(session_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-model pricing rates in US dollars per million tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRates {
    /// Price per million input (prompt) tokens.
    pub input: f64,
    /// Price per million output (completion) tokens.
    pub output: f64,
}

impl ModelRates {
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }
}

/// Incremental usage for a single session within one reporting period.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLineItem {
    pub session_id: String,
    pub model: String,
    /// Tokens consumed since the previous snapshot.
    pub delta_tokens: u64,
    /// Estimated cost (USD) of `delta_tokens`, unrounded.
    pub delta_cost: f64,
}

/// Where a rendered report is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Channel name understood by the delivery tool (e.g. `"telegram"`).
    pub channel: String,
    /// Channel-specific address (chat id, user id, ...).
    pub target: String,
}

impl Destination {
    pub fn new(channel: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            target: target.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_empty_has_no_timestamp() {
        let snap = Snapshot::empty();
        assert!(snap.timestamp.is_none());
        assert!(snap.is_empty());
    }

    #[test]
    fn test_snapshot_last_seen_defaults_to_zero() {
        let mut snap = Snapshot::empty();
        snap.entries.insert("a".to_string(), 42);
        assert_eq!(snap.last_seen("a"), 42);
        assert_eq!(snap.last_seen("b"), 0);
    }

    #[test]
    fn test_parse_token_count() {
        use serde_json::json;

        assert_eq!(parse_token_count(&json!(1_000_000)), Some(1_000_000));
        assert_eq!(parse_token_count(&json!(1234.0)), Some(1234));
        assert_eq!(parse_token_count(&json!(12.9)), Some(12));
        assert_eq!(parse_token_count(&json!(-5)), None);
        assert_eq!(parse_token_count(&json!("lots")), None);
        assert_eq!(parse_token_count(&json!(null)), None);
    }

    #[test]
    fn test_model_rates_deserialize() {
        let rates: ModelRates = serde_json::from_str(r#"{"input": 3, "output": 15.5}"#).unwrap();
        assert_eq!(rates, ModelRates::new(3.0, 15.5));
    }
}
