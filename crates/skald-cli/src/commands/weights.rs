//! Weights command implementation.

use super::parse_feature_type;
use crate::cli::{WeightsAction, WeightsArgs};
use crate::error::Result;
use crate::output::Formatter;
use skald_domain::traits::{Clock, SystemClock, WeightStore};
use skald_learner::{LearnerConfig, WeightLearner};
use skald_store::SqliteStore;
use std::io::{self, Write};

/// Execute the weights command.
pub fn execute_weights(
    args: WeightsArgs,
    store: &mut SqliteStore,
    learner: &LearnerConfig,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        WeightsAction::Show => show_weights(store, formatter),
        WeightsAction::Set { feature_type, weight } => set_weight(store, &feature_type, weight, formatter),
        WeightsAction::History { feature_type } => show_history(store, &feature_type, formatter),
        WeightsAction::Reset { yes } => reset_weights(store, learner, yes, formatter),
    }
}

/// Show effective weights.
fn show_weights(store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let snapshot = store.snapshot()?;
    let records = store.weight_records()?;
    println!("{}", formatter.format_weights(&snapshot, &records)?);
    Ok(())
}

/// Set one weight.
fn set_weight(store: &mut SqliteStore, name: &str, weight: f64, formatter: &Formatter) -> Result<()> {
    let feature_type = parse_feature_type(name)?;
    let record = store.set_weight(feature_type, weight, SystemClock.now())?;
    println!(
        "{}",
        formatter.success(&format!(
            "{} set to {} (version {})",
            record.feature_type, record.weight, record.version
        ))
    );
    Ok(())
}

/// Show the history of one weight.
fn show_history(store: &SqliteStore, name: &str, formatter: &Formatter) -> Result<()> {
    let entries = store.weight_history(parse_feature_type(name)?)?;
    println!("{}", formatter.format_history(&entries)?);
    Ok(())
}

/// Restore every weight to its default.
fn reset_weights(
    store: &mut SqliteStore,
    config: &LearnerConfig,
    yes: bool,
    formatter: &Formatter,
) -> Result<()> {
    // Confirm unless --yes is specified
    if !yes {
        print!("Reset all feature weights to their defaults? [y/N] ");
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;

        if !response.trim().eq_ignore_ascii_case("y") {
            println!("{}", formatter.info("Operation cancelled"));
            return Ok(());
        }
    }

    let snapshot = WeightLearner::new(config.clone())?.reset(store)?;
    println!(
        "{}",
        formatter.success(&format!("Weights reset to defaults (version {})", snapshot.version()))
    );
    Ok(())
}
