mod bootstrap;

use anyhow::Result;
use reporter_core::report::NO_USAGE_MESSAGE;
use reporter_core::settings::Settings;
use reporter_core::snapshot::SnapshotStore;
use reporter_data::sessions::CommandSessionSource;
use reporter_runtime::notifier::CommandNotifier;
use reporter_runtime::runner::{RunOutcome, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("usage-reporter v{} starting", env!("CARGO_PKG_VERSION"));

    let stats_file = bootstrap::expand_home(&settings.stats_file);
    let pricing_file = bootstrap::expand_home(&settings.pricing_file);
    tracing::debug!(
        stats = %stats_file.display(),
        pricing = %pricing_file.display(),
        program = %settings.program,
        limit = settings.limit,
        "resolved configuration"
    );

    let runner = Runner::new(
        CommandSessionSource::new(settings.program.clone()),
        CommandNotifier::new(settings.program.clone()),
        SnapshotStore::new(stats_file),
        pricing_file,
        settings.destination(),
        settings.limit,
    );

    let summary = runner.run_once(chrono::Utc::now()).await;

    for issue in &summary.issues {
        tracing::warn!(stage = %issue.stage, "{}", issue.message);
    }

    match summary.outcome {
        RunOutcome::NoUsage => println!("{NO_USAGE_MESSAGE}"),
        RunOutcome::Delivered => tracing::info!("report sent"),
        RunOutcome::DeliveryFailed => tracing::warn!("report was not delivered"),
    }

    Ok(())
}
