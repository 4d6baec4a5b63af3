//! Data ingestion layer for the usage reporter.
//!
//! Fetches the current session list, with cumulative token counts, from the
//! gateway's session ledger.

pub mod sessions;

pub use reporter_core as core;
