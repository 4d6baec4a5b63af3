//! Core types and computations for the usage reporter.
//!
//! Holds the data model, pricing, delta accounting against the persisted
//! snapshot, report rendering and CLI settings. Nothing here talks to the
//! session ledger or the delivery channel.

pub mod delta;
pub mod error;
pub mod models;
pub mod pricing;
pub mod report;
pub mod settings;
pub mod snapshot;

pub use error::{ReporterError, Result};
