use clap::builder::TypedValueParser;
use clap::Parser;
use std::path::PathBuf;

use crate::models::Destination;

/// Default number of sessions requested from the session ledger per run.
pub const DEFAULT_SESSION_LIMIT: usize = 100;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Report token spend accrued since the previous run
#[derive(Parser, Debug, Clone)]
#[command(
    name = "usage-reporter",
    about = "Report token spend accrued since the previous run",
    version
)]
pub struct Settings {
    /// Pricing table (model -> {input, output} dollars per million tokens)
    #[arg(long, env = "USAGE_REPORTER_PRICING_FILE", default_value = "memory/pricing.json")]
    pub pricing_file: PathBuf,

    /// Usage snapshot written at the end of every run
    #[arg(long, env = "USAGE_REPORTER_STATS_FILE", default_value = "memory/usage_stats.json")]
    pub stats_file: PathBuf,

    /// Maximum number of sessions to request from the ledger
    #[arg(
        long,
        env = "USAGE_REPORTER_LIMIT",
        default_value_t = DEFAULT_SESSION_LIMIT,
        value_parser = clap::value_parser!(u64).range(1..=10_000).map(|v| v as usize)
    )]
    pub limit: usize,

    /// Gateway CLI used to list sessions and send messages
    #[arg(long, env = "USAGE_REPORTER_PROGRAM", default_value = "openclaw")]
    pub program: String,

    /// Delivery channel for the report
    #[arg(long, env = "USAGE_REPORTER_CHANNEL", default_value = "telegram")]
    pub channel: String,

    /// Delivery address on the channel (chat or user id)
    #[arg(long, env = "USAGE_REPORTER_TARGET")]
    pub target: Option<String>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Report destination; an unset target becomes an empty address, which
    /// the notifier rejects.
    pub fn destination(&self) -> Destination {
        Destination::new(
            self.channel.clone(),
            self.target.clone().unwrap_or_default(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // Tests in this module avoid relying on USAGE_REPORTER_* being unset by
    // passing every env-backed value they assert on explicitly.

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["usage-reporter"]);

        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_cli_paths() {
        let settings = Settings::parse_from([
            "usage-reporter",
            "--pricing-file",
            "/etc/reporter/pricing.json",
            "--stats-file",
            "/var/lib/reporter/stats.json",
        ]);
        assert_eq!(
            settings.pricing_file,
            PathBuf::from("/etc/reporter/pricing.json")
        );
        assert_eq!(
            settings.stats_file,
            PathBuf::from("/var/lib/reporter/stats.json")
        );
    }

    #[test]
    fn test_settings_cli_limit() {
        let settings = Settings::parse_from(["usage-reporter", "--limit", "250"]);
        assert_eq!(settings.limit, 250);
    }

    #[test]
    fn test_settings_rejects_zero_limit() {
        assert!(Settings::try_parse_from(["usage-reporter", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_settings_rejects_unknown_log_level() {
        assert!(Settings::try_parse_from(["usage-reporter", "--log-level", "TRACE"]).is_err());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let settings =
            Settings::load_from_args(["usage-reporter", "--log-level", "ERROR", "--debug"]);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_destination_from_cli() {
        let settings = Settings::parse_from([
            "usage-reporter",
            "--channel",
            "telegram",
            "--target",
            "424242",
        ]);
        assert_eq!(settings.destination(), Destination::new("telegram", "424242"));
    }
}
