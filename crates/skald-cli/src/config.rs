//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use skald_learner::LearnerConfig;
use skald_review::ReviewConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration, read from `~/.skald/config.toml`.
///
/// ```toml
/// database = "/home/me/.skald/skald.db"
///
/// [settings]
/// color = true
/// format = "table"
/// actor = "alice"
///
/// [review]
/// auto_accept_min_confidence = 95.0
/// auto_accept_methods = ["hybrid"]
///
/// [learner]
/// learning_rate = 0.1
/// interval_minutes = 60
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Suggestion review and auto-accept options
    #[serde(default)]
    pub review: ReviewConfig,

    /// Weight recalibration options
    #[serde(default)]
    pub learner: LearnerConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Reviewer name recorded with decisions
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Directory holding the configuration and the default database.
    pub fn dir() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".skald"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::dir()?.join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// default configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the review and learner sections.
    pub fn validate(&self) -> Result<()> {
        self.review
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        self.learner
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        if self.settings.actor.trim().is_empty() {
            return Err(CliError::Config("settings.actor must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            settings: Settings::default(),
            review: ReviewConfig::default(),
            learner: LearnerConfig::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
            actor: default_actor(),
        }
    }
}

fn default_database() -> PathBuf {
    Config::dir()
        .map(|dir| dir.join("skald.db"))
        .unwrap_or_else(|_| PathBuf::from("skald.db"))
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_actor() -> String {
    "reviewer".to_string()
}
