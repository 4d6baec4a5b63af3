//! Report delivery.
//!
//! Reports are sent through the gateway CLI:
//! `<program> message send --channel <channel> --target <target> --message <text>`.
//! A failed send is reported to the caller and never retried here.

use std::process::Stdio;

use reporter_core::models::Destination;
use reporter_core::{ReporterError, Result};
use tokio::process::Command;

/// Anything that can deliver a text payload to a destination.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn deliver(&self, text: &str, destination: &Destination) -> Result<()>;
}

/// [`Notifier`] backed by the gateway CLI.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Notifier for CommandNotifier {
    async fn deliver(&self, text: &str, destination: &Destination) -> Result<()> {
        if destination.target.trim().is_empty() {
            return Err(ReporterError::Config(
                "no delivery target configured".to_string(),
            ));
        }

        let output = Command::new(&self.program)
            .args(["message", "send"])
            .args(["--channel", &destination.channel])
            .args(["--target", &destination.target])
            .args(["--message", text])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ReporterError::Delivery(format!("failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReporterError::Delivery(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        tracing::debug!(
            channel = %destination.channel,
            target = %destination.target,
            bytes = text.len(),
            "report delivered"
        );
        Ok(())
    }
}
