//! File-backed store for the usage [`Snapshot`].
//!
//! The snapshot lives in a single JSON document:
//!
//! ```json
//! {
//!   "timestamp": "2026-10-19T06:00:00+00:00",
//!   "sessions": { "agent:main:main": 182734, "cron:daily": 5120 }
//! }
//! ```
//!
//! Counts written as decimals (`1234.0`) are truncated on load; entries that
//! are not non-negative numbers are dropped with a warning.
//!
//! Loading never fails the caller: a missing or unreadable document yields an
//! empty snapshot so that every session is treated as entirely new usage.
//! Saving replaces the whole document atomically, so a run that fails before
//! (or while) writing leaves the previous snapshot intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ReporterError, Result};
use crate::models::{parse_token_count, Snapshot};

// ── On-disk representation ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, Default)]
struct SnapshotFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(default)]
    sessions: BTreeMap<String, Value>,
}

impl From<&Snapshot> for SnapshotFile {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp.map(|ts| ts.to_rfc3339()),
            sessions: snapshot
                .entries
                .iter()
                .map(|(id, tokens)| (id.clone(), Value::from(*tokens)))
                .collect(),
        }
    }
}

impl From<SnapshotFile> for Snapshot {
    fn from(file: SnapshotFile) -> Self {
        Self {
            timestamp: file.timestamp.as_deref().and_then(parse_timestamp),
            entries: file
                .sessions
                .into_iter()
                .filter_map(|(id, value)| match parse_token_count(&value) {
                    Some(tokens) => Some((id, tokens)),
                    None => {
                        tracing::warn!(
                            session = %id,
                            value = %value,
                            "snapshot entry is not a token count; dropping"
                        );
                        None
                    }
                })
                .collect(),
        }
    }
}

/// Parse a snapshot timestamp.
///
/// Accepts RFC 3339 as well as naive ISO-8601 (`2026-10-19T06:00:00.123456`),
/// which is interpreted in the local timezone.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => Some(local.with_timezone(&Utc)),
        None => {
            tracing::debug!(timestamp = raw, "snapshot timestamp falls in a DST gap");
            None
        }
    }
}

// ── SnapshotStore ─────────────────────────────────────────────────────────────

/// Loads and persists the usage snapshot at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, reporting why it could not be read.
    ///
    /// A missing file is not an error: it yields the empty snapshot.
    pub fn try_load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot::empty());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|source| ReporterError::FileRead {
                path: self.path.clone(),
                source,
            })?;
        let file: SnapshotFile = serde_json::from_str(&content)?;
        Ok(file.into())
    }

    /// Load the snapshot, falling back to the empty snapshot on any error.
    pub fn load(&self) -> Snapshot {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "failed to load usage snapshot; starting from an empty baseline"
                );
                Snapshot::empty()
            }
        }
    }

    /// Atomically replace the stored snapshot, creating parent directories
    /// if needed.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let write_err = |source| ReporterError::FileWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(&SnapshotFile::from(snapshot))?;

        // Write to a temp file then rename for atomicity.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;

        tracing::debug!(
            path = %self.path.display(),
            sessions = snapshot.entries.len(),
            "usage snapshot saved"
        );
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
