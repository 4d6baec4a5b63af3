//! Session ledger access.
//!
//! The ledger is read through the gateway CLI
//! (`<program> sessions list --limit N --json`), which prints a document like:
//!
//! ```json
//! { "sessions": [ { "key": "agent:main:main", "model": "claude-opus-4", "totalTokens": 182734 } ] }
//! ```
//!
//! Records are validated one at a time: a malformed record is skipped with a
//! warning, while a malformed document fails the whole fetch.
//!
//! The CLI may exit non-zero after printing a complete listing (for example
//! when a secondary lookup fails). Stdout is parsed first either way; the exit
//! status only fails the fetch when stdout holds no valid document.

use std::process::Stdio;

use reporter_core::models::{parse_token_count, SessionRecord};
use reporter_core::{ReporterError, Result};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

/// Model name recorded for sessions that do not report one.
pub const UNKNOWN_MODEL: &str = "unknown";

// ── SessionSource ─────────────────────────────────────────────────────────────

/// Anything that can list the current sessions with their cumulative usage.
#[allow(async_fn_in_trait)]
pub trait SessionSource {
    /// Fetch at most `limit` sessions, in the order the ledger returns them.
    async fn fetch(&self, limit: usize) -> Result<Vec<SessionRecord>>;
}

/// Fetch sessions, degrading any failure to an empty list.
///
/// The error is handed back alongside the (empty) list so the caller can
/// report it.
pub async fn fetch_or_empty<S: SessionSource>(
    source: &S,
    limit: usize,
) -> (Vec<SessionRecord>, Option<ReporterError>) {
    match source.fetch(limit).await {
        Ok(sessions) => {
            debug!(count = sessions.len(), limit, "fetched sessions");
            (sessions, None)
        }
        Err(e) => {
            warn!(error = %e, "session fetch failed; treating as no sessions");
            (Vec::new(), Some(e))
        }
    }
}

// ── CommandSessionSource ──────────────────────────────────────────────────────

/// [`SessionSource`] backed by the gateway CLI.
#[derive(Debug, Clone)]
pub struct CommandSessionSource {
    program: String,
}

impl CommandSessionSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SessionSource for CommandSessionSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let output = Command::new(&self.program)
            .args(["sessions", "list", "--limit", &limit.to_string(), "--json"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ReporterError::SourceFetch(format!("failed to run {}: {e}", self.program))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            return parse_sessions(&stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match parse_sessions(&stdout) {
            Ok(sessions) => {
                warn!(
                    program = %self.program,
                    status = %output.status,
                    stderr = %stderr.trim(),
                    "session list exited unsuccessfully; using its output"
                );
                Ok(sessions)
            }
            Err(_) => Err(ReporterError::SourceFetch(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ))),
        }
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse a session-list document into records, preserving order.
pub fn parse_sessions(raw: &str) -> Result<Vec<SessionRecord>> {
    let doc: Value = serde_json::from_str(raw.trim())?;

    if !doc.is_object() {
        return Err(ReporterError::SourceFormat(
            "document must be a JSON object".to_string(),
        ));
    }

    let sessions = doc
        .get("sessions")
        .ok_or_else(|| ReporterError::SourceFormat("missing field 'sessions'".to_string()))?
        .as_array()
        .ok_or_else(|| {
            ReporterError::SourceFormat("field 'sessions' must be an array".to_string())
        })?;

    Ok(sessions
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| parse_record(idx, record))
        .collect())
}

/// Validate a single session object; `None` means "skip this record".
fn parse_record(idx: usize, record: &Value) -> Option<SessionRecord> {
    let Some(key) = record.get("key").and_then(Value::as_str) else {
        warn!(index = idx, "session record has no string 'key'; skipping");
        return None;
    };

    let model = record
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_MODEL);

    let cumulative_tokens = match record.get("totalTokens") {
        None | Some(Value::Null) => 0,
        Some(value) => match parse_token_count(value) {
            Some(n) => n,
            None => {
                warn!(
                    index = idx,
                    session = key,
                    value = %value,
                    "session record has an invalid 'totalTokens'; skipping"
                );
                return None;
            }
        },
    };

    Some(SessionRecord::new(key, model, cumulative_tokens))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
