//! Recalibration commands.

use crate::cli::{RecalibrateArgs, WorkerArgs};
use crate::error::Result;
use crate::output::Formatter;
use skald_learner::{LearnerConfig, LearnerWorker, RecalibrationWindow, WeightLearner};
use skald_store::SqliteStore;

/// Execute the recalibrate command.
pub fn execute_recalibrate(
    args: RecalibrateArgs,
    store: &mut SqliteStore,
    config: &LearnerConfig,
    formatter: &Formatter,
) -> Result<()> {
    let config = LearnerConfig {
        dry_run: config.dry_run || args.dry_run,
        ..config.clone()
    };
    let window = window(args.window_hours, &config);

    let mut learner = WeightLearner::new(config)?;
    let report = learner.recalibrate(store, window)?;

    println!("{}", formatter.format_report(&report)?);
    if !report.failed.is_empty() {
        eprintln!(
            "{}",
            formatter.warning(&format!("{} feature type(s) could not be updated", report.failed.len()))
        );
    }
    Ok(())
}

/// Execute the worker command.
pub async fn execute_worker(
    args: WorkerArgs,
    store: SqliteStore,
    config: &LearnerConfig,
    formatter: &Formatter,
) -> Result<()> {
    let config = LearnerConfig {
        interval_minutes: args.interval_minutes.unwrap_or(config.interval_minutes),
        ..config.clone()
    };
    println!(
        "{}",
        formatter.info(&format!(
            "Recalibrating every {} minute(s), press Ctrl+C to stop",
            config.interval_minutes
        ))
    );

    let mut worker = LearnerWorker::new(config)?;
    match args.cycles {
        Some(cycles) => {
            worker.run_cycles(store, cycles).await?;
        }
        None => worker.run(store).await?,
    }

    println!("{}", worker.metrics().summary());
    Ok(())
}

/// Window selected by `--window-hours`, else by the configuration.
fn window(hours: Option<u64>, config: &LearnerConfig) -> RecalibrationWindow {
    match hours {
        Some(hours) => RecalibrationWindow::trailing_hours(hours),
        None => config.window(),
    }
}
