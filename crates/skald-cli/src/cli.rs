//! CLI command definitions and argument parsing.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// Skald CLI - Review relationship suggestions and tune feature weights.
#[derive(Debug, Parser)]
#[command(name = "skald")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides the configuration)
    #[arg(long, env = "SKALD_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Reviewer name recorded with decisions
    #[arg(long, env = "SKALD_ACTOR", global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List pending suggestions, highest priority first
    Pending(PendingArgs),

    /// Show one suggestion with its features and feedback
    Show(IdArgs),

    /// Accept a pending suggestion
    Accept(IdArgs),

    /// Reject a pending suggestion
    Reject(RejectArgs),

    /// Accept a pending suggestion with corrections
    Modify(ModifyArgs),

    /// Set a pending suggestion aside without teaching the learner
    Dismiss(IdArgs),

    /// Score candidates from a JSON file and store them
    Suggest(SuggestArgs),

    /// Inspect or change feature weights
    Weights(WeightsArgs),

    /// Recalibrate feature weights from recorded feedback
    Recalibrate(RecalibrateArgs),

    /// Run scheduled recalibration until interrupted
    Worker(WorkerArgs),

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for the pending command.
#[derive(Debug, Parser)]
pub struct PendingArgs {
    /// Restrict to one saga
    #[arg(short, long)]
    pub scope: Option<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// A single suggestion id.
#[derive(Debug, Parser)]
pub struct IdArgs {
    /// Suggestion ID
    pub id: String,
}

/// Arguments for the reject command.
#[derive(Debug, Parser)]
pub struct RejectArgs {
    /// Suggestion ID
    pub id: String,

    /// Why the suggestion is wrong
    #[arg(short, long)]
    pub text: Option<String>,
}

/// Arguments for the modify command.
#[derive(Debug, Parser)]
#[command(group(
    ArgGroup::new("correction")
        .required(true)
        .multiple(true)
        .args(["relationship_type", "strength"])
))]
pub struct ModifyArgs {
    /// Suggestion ID
    pub id: String,

    /// Corrected relationship label
    #[arg(short = 't', long = "type")]
    pub relationship_type: Option<String>,

    /// Corrected strength (0-100)
    #[arg(short, long)]
    pub strength: Option<f64>,

    /// Reviewer comment
    #[arg(long)]
    pub text: Option<String>,
}

/// Arguments for the suggest command.
#[derive(Debug, Parser)]
pub struct SuggestArgs {
    /// JSON file containing candidates and their raw signals
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// JSON array of candidates from stdin
    #[arg(long)]
    pub stdin: bool,
}

/// Arguments for weight management.
#[derive(Debug, Parser)]
pub struct WeightsArgs {
    #[command(subcommand)]
    pub action: WeightsAction,
}

/// Weight management actions.
#[derive(Debug, Subcommand)]
pub enum WeightsAction {
    /// Show the effective weight of every feature type
    Show,

    /// Set one weight explicitly
    Set {
        /// Feature type (e.g. co_occurrence)
        feature_type: String,
        /// New weight (0.0-1.0)
        weight: f64,
    },

    /// Show the change history of one feature type
    History {
        /// Feature type (e.g. co_occurrence)
        feature_type: String,
    },

    /// Restore every weight to its default
    Reset {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Arguments for the recalibrate command.
#[derive(Debug, Parser)]
pub struct RecalibrateArgs {
    /// Only learn from feedback recorded in the last N hours
    #[arg(short, long)]
    pub window_hours: Option<u64>,

    /// Compute adjustments without committing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the worker command.
#[derive(Debug, Parser)]
pub struct WorkerArgs {
    /// Minutes between runs (overrides the configuration)
    #[arg(short, long)]
    pub interval_minutes: Option<u64>,

    /// Stop after this many runs
    #[arg(long)]
    pub cycles: Option<usize>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_command() {
        let cli = Cli::parse_from(["skald", "pending", "--scope", "saga-1", "-l", "5"]);
        match cli.command {
            Command::Pending(args) => {
                assert_eq!(args.scope.as_deref(), Some("saga-1"));
                assert_eq!(args.limit, Some(5));
            }
            _ => panic!("Expected Pending command"),
        }
    }

    #[test]
    fn test_modify_requires_a_correction() {
        assert!(Cli::try_parse_from(["skald", "modify", "some-id"]).is_err());

        let cli = Cli::parse_from(["skald", "modify", "some-id", "--type", "mentor"]);
        match cli.command {
            Command::Modify(args) => {
                assert_eq!(args.relationship_type.as_deref(), Some("mentor"));
                assert!(args.strength.is_none());
            }
            _ => panic!("Expected Modify command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "skald",
            "weights",
            "show",
            "--format",
            "json",
            "--db",
            "/tmp/x.db",
        ]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
    }

    #[test]
    fn test_recalibrate_command() {
        let cli = Cli::parse_from(["skald", "recalibrate", "--window-hours", "24", "--dry-run"]);
        match cli.command {
            Command::Recalibrate(args) => {
                assert_eq!(args.window_hours, Some(24));
                assert!(args.dry_run);
            }
            _ => panic!("Expected Recalibrate command"),
        }
    }
}
