//! Skald Learner
//!
//! Recalibrates feature weights from the feedback reviewers leave on
//! suggestions.
//!
//! # Overview
//!
//! The learner is responsible for:
//! - **Recalibration**: nudging each feature type's weight toward the
//!   decisions reviewers actually took
//! - **Optimistic concurrency**: committing each type only if the weight
//!   version is unchanged, retrying on conflict
//! - **Scheduling**: an interval worker stopped by Ctrl+C
//! - **Metrics collection**: counting runs, updates and conflicts
//!
//! # Usage
//!
//! ## One-time Recalibration
//!
//! ```no_run
//! use skald_learner::{RecalibrationWindow, WeightLearner};
//! use skald_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = SqliteStore::new("skald.db")?;
//! let mut learner = WeightLearner::default_config()?;
//!
//! let report = learner.recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)?;
//! println!("{}", report.summary());
//! println!("{}", learner.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! The learner can be configured via TOML:
//!
//! ```toml
//! [learner]
//! learning_rate = 0.1
//! max_attempts = 3
//! min_delta = 0.001
//! interval_minutes = 60
//! window_hours = 168
//! dry_run = false
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod learner;
mod metrics;
mod worker;

pub use config::LearnerConfig;
pub use error::LearnerError;
pub use learner::{CalibrationReport, RecalibrationWindow, WeightAdjustment, WeightLearner};
pub use metrics::LearnerMetrics;
pub use worker::LearnerWorker;
