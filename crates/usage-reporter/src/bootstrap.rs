use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"info"` if the level string is not recognised. Logs go to
/// stderr so that stdout only carries the run's user-facing output.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()?;

    Ok(())
}

/// Map Python-style level names to tracing directives (tracing uses lowercase).
fn filter_directive(log_level: &str) -> String {
    let upper = log_level.to_uppercase();
    match upper.as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

// ── Path resolution ────────────────────────────────────────────────────────────

/// Expand a leading `~/` to the user's home directory.
///
/// Paths without the prefix, or when no home directory can be determined,
/// are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_python_names() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("INFO"), "info");
        assert_eq!(filter_directive("WARNING"), "warn");
        assert_eq!(filter_directive("error"), "error");
    }

    #[test]
    fn test_filter_directive_passes_through_unknown() {
        assert_eq!(filter_directive("TRACE"), "trace");
    }

    #[test]
    fn test_expand_home_leaves_relative_paths() {
        let path = Path::new("memory/usage_stats.json");
        assert_eq!(expand_home(path), PathBuf::from("memory/usage_stats.json"));
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        let path = Path::new("/var/lib/reporter/pricing.json");
        assert_eq!(expand_home(path), path.to_path_buf());
    }

    #[test]
    fn test_expand_home_resolves_tilde() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_home(Path::new("~/memory/pricing.json")),
            home.join("memory").join("pricing.json")
        );
    }
}
