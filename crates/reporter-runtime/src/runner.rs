//! Single reporting run.
//!
//! [`Runner::run_once`] wires the adapters around the pure delta computation:
//!
//! 1. load pricing and the previous snapshot, fetch the current sessions;
//! 2. compute deltas and the replacement snapshot;
//! 3. persist the snapshot (even when there is nothing to report);
//! 4. render and deliver the report when it has line items.
//!
//! No failure aborts the run. Every adapter failure degrades to a safe default
//! and is recorded as a [`RunIssue`] on the returned [`RunSummary`].

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use reporter_core::delta::{compute_deltas, CounterRegression};
use reporter_core::models::{Destination, Snapshot};
use reporter_core::pricing::PricingTable;
use reporter_core::report::{render_report, Report};
use reporter_core::snapshot::SnapshotStore;
use reporter_core::ReporterError;
use reporter_data::sessions::{fetch_or_empty, SessionSource};
use tracing::{debug, info, warn};

use crate::notifier::Notifier;

// ── Public types ──────────────────────────────────────────────────────────────

/// Step of a run that an issue was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Pricing,
    Snapshot,
    Source,
    Persist,
    Delivery,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Pricing => "pricing",
            RunStage::Snapshot => "snapshot",
            RunStage::Source => "source",
            RunStage::Persist => "persist",
            RunStage::Delivery => "delivery",
        };
        f.write_str(name)
    }
}

/// A non-fatal failure observed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIssue {
    pub stage: RunStage,
    pub message: String,
}

impl RunIssue {
    fn new(stage: RunStage, error: &ReporterError) -> Self {
        Self {
            stage,
            message: error.to_string(),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No session accrued usage; nothing was delivered.
    NoUsage,
    /// The report was handed to the notifier successfully.
    Delivered,
    /// A report was produced but could not be delivered.
    DeliveryFailed,
}

/// Everything an operator needs to know about one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// The priced report, when there was usage to report.
    pub report: Option<Report>,
    /// The rendered report text, when there was usage to report.
    pub message: Option<String>,
    /// Whether the replacement snapshot reached disk.
    pub snapshot_saved: bool,
    /// Sessions whose cumulative counters went backwards.
    pub regressions: Vec<CounterRegression>,
    pub issues: Vec<RunIssue>,
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Performs one metering run against a session source and a notifier.
pub struct Runner<S, N> {
    source: S,
    notifier: N,
    store: SnapshotStore,
    pricing_path: PathBuf,
    destination: Destination,
    limit: usize,
}

impl<S: SessionSource, N: Notifier> Runner<S, N> {
    pub fn new(
        source: S,
        notifier: N,
        store: SnapshotStore,
        pricing_path: impl Into<PathBuf>,
        destination: Destination,
        limit: usize,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            pricing_path: pricing_path.into(),
            destination,
            limit,
        }
    }

    /// Run once, stamping the new snapshot with `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> RunSummary {
        let mut issues = Vec::new();

        let pricing = match PricingTable::load(&self.pricing_path) {
            Ok(table) => {
                debug!(models = table.len(), "pricing table loaded");
                table
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %self.pricing_path.display(),
                    "failed to load pricing table; all costs will be zero"
                );
                issues.push(RunIssue::new(RunStage::Pricing, &e));
                PricingTable::default()
            }
        };

        let previous = match self.store.try_load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    error = %e,
                    path = %self.store.path().display(),
                    "failed to load usage snapshot; treating all sessions as new"
                );
                issues.push(RunIssue::new(RunStage::Snapshot, &e));
                Snapshot::empty()
            }
        };

        let (sessions, fetch_err) = fetch_or_empty(&self.source, self.limit).await;
        if let Some(e) = fetch_err {
            issues.push(RunIssue::new(RunStage::Source, &e));
        }

        let outcome = compute_deltas(&previous, &sessions, &pricing, now);
        for r in &outcome.regressions {
            warn!(
                session = %r.session_id,
                model = %r.model,
                previous = r.previous,
                current = r.current,
                "session token counter decreased; delta clamped to zero"
            );
        }

        let snapshot_saved = match self.store.save(&outcome.snapshot) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to persist usage snapshot");
                issues.push(RunIssue::new(RunStage::Persist, &e));
                false
            }
        };

        let report = outcome.report;
        if report.is_empty() {
            info!(sessions = sessions.len(), "no usage since last report");
            return RunSummary {
                outcome: RunOutcome::NoUsage,
                report: None,
                message: None,
                snapshot_saved,
                regressions: outcome.regressions,
                issues,
            };
        }

        let message = render_report(&report);
        let run_outcome = match self.notifier.deliver(&message, &self.destination).await {
            Ok(()) => {
                info!(
                    line_items = report.line_items.len(),
                    tokens = report.total_tokens(),
                    total_cost = report.total_cost,
                    "usage report delivered"
                );
                RunOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    error = %e,
                    channel = %self.destination.channel,
                    "failed to deliver usage report"
                );
                issues.push(RunIssue::new(RunStage::Delivery, &e));
                RunOutcome::DeliveryFailed
            }
        };

        RunSummary {
            outcome: run_outcome,
            report: Some(report),
            message: Some(message),
            snapshot_saved,
            regressions: outcome.regressions,
            issues,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
