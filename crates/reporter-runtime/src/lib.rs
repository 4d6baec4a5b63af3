//! Runtime layer for the usage reporter.
//!
//! Delivers rendered reports and drives a single metering run from the
//! session source through persistence and delivery.

pub mod notifier;
pub mod runner;

pub use reporter_core as core;
pub use reporter_data as data;
