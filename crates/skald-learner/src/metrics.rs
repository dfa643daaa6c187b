//! Metrics collection for recalibration runs

use skald_domain::FeatureType;
use std::collections::HashMap;

use crate::CalibrationReport;

/// Metrics collected across recalibration runs
#[derive(Debug, Clone, Default)]
pub struct LearnerMetrics {
    /// Weight updates committed per feature type
    pub updates: HashMap<FeatureType, usize>,

    /// Failed per-type commits per feature type
    pub failures: HashMap<FeatureType, usize>,

    /// Completed runs
    pub run_count: usize,

    /// Runs abandoned after exhausting their attempts
    pub conflict_count: usize,

    /// Extra attempts caused by version conflicts
    pub retry_count: usize,

    /// Feedback records consumed by completed runs
    pub feedback_consumed: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl LearnerMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a completed run into the counters
    pub fn record_run(&mut self, report: &CalibrationReport) {
        self.run_count += 1;
        self.retry_count += report.attempts.saturating_sub(1) as usize;
        self.feedback_consumed += report.feedback_consumed;
        if !report.dry_run {
            for adjustment in &report.adjustments {
                *self.updates.entry(adjustment.feature_type).or_insert(0) += 1;
            }
        }
        for (feature_type, _) in &report.failed {
            *self.failures.entry(*feature_type).or_insert(0) += 1;
        }
    }

    /// Record a run that gave up on conflicts
    pub fn record_conflict(&mut self, attempts: u32) {
        self.conflict_count += 1;
        self.retry_count += attempts.saturating_sub(1) as usize;
    }

    /// Get total committed weight updates
    pub fn total_updates(&self) -> usize {
        self.updates.values().sum()
    }

    /// Get total failed per-type commits
    pub fn total_failures(&self) -> usize {
        self.failures.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Learner Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Runs: {}", self.run_count),
            format!("Conflicted runs: {}", self.conflict_count),
            format!("Retries: {}", self.retry_count),
            format!("Feedback consumed: {}", self.feedback_consumed),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
        ];

        if !self.updates.is_empty() {
            lines.push("Updates by feature type:".to_string());
            let mut updates: Vec<_> = self.updates.iter().collect();
            updates.sort();
            for (feature_type, count) in updates {
                lines.push(format!("  {}: {}", feature_type, count));
            }
            lines.push(format!("  Total: {}", self.total_updates()));
        }

        if !self.failures.is_empty() {
            lines.push("Failures by feature type:".to_string());
            let mut failures: Vec<_> = self.failures.iter().collect();
            failures.sort();
            for (feature_type, count) in failures {
                lines.push(format!("  {}: {}", feature_type, count));
            }
        }

        lines.join("\n")
    }
}
