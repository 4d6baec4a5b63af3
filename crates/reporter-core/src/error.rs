use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the usage reporter.
#[derive(Error, Debug)]
pub enum ReporterError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written or moved into place.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The session source command could not be run or exited unsuccessfully.
    #[error("Session fetch failed: {0}")]
    SourceFetch(String),

    /// The session source answered with a document of the wrong shape.
    #[error("Unexpected session list format: {0}")]
    SourceFormat(String),

    /// The report could not be handed to the delivery channel.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the reporter crates.
pub type Result<T> = std::result::Result<T, ReporterError>;
