//! Incremental usage accounting against the previous [`Snapshot`].
//!
//! The session ledger reports *cumulative* token counts. [`compute_deltas`]
//! turns those into the usage accrued since the last run, prices each delta,
//! and produces the snapshot the next run will be measured against.

use chrono::{DateTime, Utc};

use crate::models::{ReportLineItem, SessionRecord, Snapshot};
use crate::pricing::PricingTable;
use crate::report::Report;

/// A session whose cumulative counter went backwards between runs.
///
/// This happens on an upstream counter reset or when a session key is reused.
/// The delta for the run is clamped to zero either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRegression {
    pub session_id: String,
    pub model: String,
    /// Cumulative count recorded in the previous snapshot.
    pub previous: u64,
    /// Cumulative count reported on this run.
    pub current: u64,
}

/// Result of one delta computation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaOutcome {
    /// Priced line items for sessions with non-zero usage, in feed order.
    pub report: Report,
    /// Baseline for the next run.
    pub snapshot: Snapshot,
    /// Sessions whose counters decreased.
    pub regressions: Vec<CounterRegression>,
}

/// Compute per-session usage since `previous` and the snapshot that replaces it.
///
/// * `delta = max(0, cumulative - last_seen)`; zero deltas produce no line item.
/// * The new snapshot records each session's reported cumulative count as-is,
///   even when the delta was clamped, and keeps entries for sessions that are
///   absent from `sessions`.
/// * A session id repeated within `sessions` is measured against the value
///   recorded by its earlier occurrence.
pub fn compute_deltas(
    previous: &Snapshot,
    sessions: &[SessionRecord],
    pricing: &PricingTable,
    now: DateTime<Utc>,
) -> DeltaOutcome {
    let mut entries = previous.entries.clone();
    let mut line_items = Vec::new();
    let mut regressions = Vec::new();

    for session in sessions {
        let prior = entries.get(&session.id).copied().unwrap_or(0);
        let current = session.cumulative_tokens;

        if current < prior {
            regressions.push(CounterRegression {
                session_id: session.id.clone(),
                model: session.model.clone(),
                previous: prior,
                current,
            });
        }

        let delta = current.saturating_sub(prior);
        if delta > 0 {
            line_items.push(ReportLineItem {
                session_id: session.id.clone(),
                model: session.model.clone(),
                delta_tokens: delta,
                delta_cost: pricing.cost_for(&session.model, delta),
            });
        }

        entries.insert(session.id.clone(), current);
    }

    DeltaOutcome {
        report: Report::from_line_items(line_items),
        snapshot: Snapshot {
            timestamp: Some(now),
            entries,
        },
        regressions,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap()
    }

    fn pricing() -> PricingTable {
        PricingTable::from_json(r#"{"m1": {"input": 1, "output": 2}}"#).unwrap()
    }

    fn snapshot_of(pairs: &[(&str, u64)]) -> Snapshot {
        Snapshot {
            timestamp: Some(Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap()),
            entries: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn test_first_run_charges_full_cumulative() {
        let sessions = [SessionRecord::new("a", "m1", 500_000)];
        let out = compute_deltas(&Snapshot::empty(), &sessions, &pricing(), now());

        assert_eq!(out.report.line_items.len(), 1);
        let item = &out.report.line_items[0];
        assert_eq!(item.model, "m1");
        assert_eq!(item.delta_tokens, 500_000);
        assert!((item.delta_cost - 0.6).abs() < 1e-9);
        assert!((out.report.total_cost - 0.6).abs() < 1e-9);
        assert_eq!(out.snapshot.last_seen("a"), 500_000);
        assert_eq!(out.snapshot.timestamp, Some(now()));
    }

    #[test]
    fn test_growth_is_measured_against_snapshot() {
        let prev = snapshot_of(&[("a", 100_000)]);
        let sessions = [SessionRecord::new("a", "m1", 350_000)];
        let out = compute_deltas(&prev, &sessions, &pricing(), now());

        assert_eq!(out.report.line_items[0].delta_tokens, 250_000);
        assert_eq!(out.snapshot.last_seen("a"), 350_000);
    }

    #[test]
    fn test_unchanged_sessions_are_idempotent() {
        let prev = snapshot_of(&[("a", 100), ("b", 2_000)]);
        let sessions = [
            SessionRecord::new("a", "m1", 100),
            SessionRecord::new("b", "m2", 2_000),
        ];
        let out = compute_deltas(&prev, &sessions, &pricing(), now());

        assert!(out.report.is_empty());
        assert_eq!(out.report.total_cost, 0.0);
        assert_eq!(out.snapshot.entries, prev.entries);
        assert!(out.regressions.is_empty());
    }

    #[test]
    fn test_counter_reset_clamps_to_zero_and_is_flagged() {
        let prev = snapshot_of(&[("a", 9_000)]);
        let sessions = [SessionRecord::new("a", "m1", 1_200)];
        let out = compute_deltas(&prev, &sessions, &pricing(), now());

        assert!(out.report.is_empty());
        // Baseline follows the reported value, not prior + delta.
        assert_eq!(out.snapshot.last_seen("a"), 1_200);
        assert_eq!(
            out.regressions,
            vec![CounterRegression {
                session_id: "a".to_string(),
                model: "m1".to_string(),
                previous: 9_000,
                current: 1_200,
            }]
        );
    }

    #[test]
    fn test_usage_after_reset_counts_from_new_baseline() {
        let prev = snapshot_of(&[("a", 9_000)]);
        let reset = compute_deltas(
            &prev,
            &[SessionRecord::new("a", "m1", 1_200)],
            &pricing(),
            now(),
        );
        let next = compute_deltas(
            &reset.snapshot,
            &[SessionRecord::new("a", "m1", 1_500)],
            &pricing(),
            now(),
        );
        assert_eq!(next.report.line_items[0].delta_tokens, 300);
    }

    #[test]
    fn test_unseen_sessions_are_carried_forward() {
        let prev = snapshot_of(&[("old", 42), ("a", 10)]);
        let sessions = [SessionRecord::new("a", "m1", 20)];
        let out = compute_deltas(&prev, &sessions, &pricing(), now());

        assert_eq!(out.snapshot.last_seen("old"), 42);
        assert_eq!(out.snapshot.last_seen("a"), 20);
    }

    #[test]
    fn test_line_items_keep_feed_order() {
        let sessions = [
            SessionRecord::new("z", "m1", 3),
            SessionRecord::new("a", "unknown", 1),
            SessionRecord::new("m", "m1", 2),
        ];
        let out = compute_deltas(&Snapshot::empty(), &sessions, &pricing(), now());
        let ids: Vec<&str> = out
            .report
            .line_items
            .iter()
            .map(|i| i.session_id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unknown_model_produces_zero_cost_line_item() {
        let sessions = [SessionRecord::new("a", "mystery", 1_000_000)];
        let out = compute_deltas(&Snapshot::empty(), &sessions, &pricing(), now());
        assert_eq!(out.report.line_items[0].delta_tokens, 1_000_000);
        assert_eq!(out.report.line_items[0].delta_cost, 0.0);
        assert_eq!(out.report.total_cost, 0.0);
    }

    #[test]
    fn test_duplicate_session_is_not_double_charged() {
        let sessions = [
            SessionRecord::new("a", "m1", 100),
            SessionRecord::new("a", "m1", 150),
        ];
        let out = compute_deltas(&Snapshot::empty(), &sessions, &pricing(), now());
        let total: u64 = out.report.line_items.iter().map(|i| i.delta_tokens).sum();
        assert_eq!(total, 150);
        assert_eq!(out.snapshot.last_seen("a"), 150);
    }

    #[test]
    fn test_monotonic_runs_sum_to_total_growth() {
        let readings = [1_000u64, 1_000, 4_500, 4_501, 90_000, 90_000, 250_000];
        let mut snapshot = snapshot_of(&[("a", 1_000)]);
        let mut reported = 0u64;

        for reading in readings {
            let out = compute_deltas(
                &snapshot,
                &[SessionRecord::new("a", "m1", reading)],
                &pricing(),
                now(),
            );
            reported += out
                .report
                .line_items
                .iter()
                .map(|i| i.delta_tokens)
                .sum::<u64>();
            snapshot = out.snapshot;
        }

        assert_eq!(reported, 250_000 - 1_000);
    }

    #[test]
    fn test_total_is_exact_sum_of_line_items() {
        let sessions = [
            SessionRecord::new("a", "m1", 333_333),
            SessionRecord::new("b", "m1", 666_667),
            SessionRecord::new("c", "m1", 1),
        ];
        let out = compute_deltas(&Snapshot::empty(), &sessions, &pricing(), now());
        let sum: f64 = out.report.line_items.iter().map(|i| i.delta_cost).sum();
        assert_eq!(out.report.total_cost, sum);
    }
}
