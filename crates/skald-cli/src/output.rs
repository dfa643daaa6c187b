//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use serde_json::{json, Value};
use skald_domain::{
    Feature, Feedback, Suggestion, SuggestionStatus, WeightHistoryEntry, WeightRecord,
    WeightSnapshot,
};
use skald_learner::CalibrationReport;
use skald_review::ReviewOutcome;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a list of suggestions.
    pub fn format_suggestions(&self, suggestions: &[Suggestion]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let items: Vec<Value> = suggestions.iter().map(suggestion_json).collect();
                Ok(serde_json::to_string_pretty(&items)?)
            }
            OutputFormat::Table => Ok(self.suggestions_table(suggestions)),
            OutputFormat::Quiet => Ok(suggestions
                .iter()
                .map(|s| s.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    /// Format one suggestion with its features and feedback.
    pub fn format_detail(
        &self,
        suggestion: &Suggestion,
        features: &[Feature],
        feedback: Option<&Feedback>,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut value = suggestion_json(suggestion);
                value["features"] = features.iter().map(feature_json).collect();
                value["feedback"] = feedback.map(feedback_json).unwrap_or(Value::Null);
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(suggestion.id.to_string()),
            OutputFormat::Table => {
                let mut lines = vec![
                    format!("Suggestion {}", suggestion.id),
                    format!(
                        "  {} -[{}]-> {} in {}",
                        suggestion.source_entity_id,
                        suggestion.relationship_type.as_str(),
                        suggestion.target_entity_id,
                        suggestion.scope
                    ),
                    format!("  Status:     {}", self.status(suggestion.status)),
                    format!(
                        "  Confidence: {:.1} ({})",
                        suggestion.confidence.value(),
                        suggestion.confidence_label().as_str()
                    ),
                    format!("  Strength:   {:.1}", suggestion.strength.value()),
                    format!("  Priority:   {:.1}", suggestion.priority.value()),
                    format!("  Method:     {}", suggestion.method),
                ];
                if let Some(reasoning) = &suggestion.reasoning {
                    lines.push(format!("  Reasoning:  {}", reasoning));
                }
                for evidence in &suggestion.evidence {
                    lines.push(format!("  Evidence:   {}", evidence));
                }
                if !features.is_empty() {
                    lines.push(String::new());
                    lines.push(self.features_table(features));
                }
                if let Some(feedback) = feedback {
                    lines.push(String::new());
                    lines.push(format!(
                        "Feedback: {} by {} ({}, quality {:.0}, learning value {:.2})",
                        feedback.action.as_str(),
                        feedback.actor,
                        feedback.decision_speed.as_str(),
                        feedback.quality_score.value(),
                        feedback.learning_value
                    ));
                    if let Some(corrections) = &feedback.corrections {
                        if let Some(label) = &corrections.relationship_type {
                            lines.push(format!("  Corrected type:     {}", label.as_str()));
                        }
                        if let Some(strength) = corrections.strength {
                            lines.push(format!("  Corrected strength: {:.1}", strength.value()));
                        }
                    }
                    if let Some(text) = &feedback.feedback_text {
                        lines.push(format!("  Comment: {}", text));
                    }
                }
                Ok(lines.join("\n"))
            }
        }
    }

    /// Format the result of a review decision.
    pub fn format_outcome(&self, outcome: &ReviewOutcome) -> Result<String> {
        let suggestion = &outcome.suggestion;
        match self.format {
            OutputFormat::Json => self.format_detail(suggestion, &[], Some(&outcome.feedback)),
            OutputFormat::Quiet => Ok(suggestion.id.to_string()),
            OutputFormat::Table => Ok(format!(
                "{}\n{}",
                self.success(&format!(
                    "Suggestion {} {} by {}",
                    suggestion.id,
                    suggestion.status.as_str(),
                    outcome.feedback.actor
                )),
                self.info(&format!(
                    "Quality {:.0}, learning value {:.2}",
                    outcome.feedback.quality_score.value(),
                    outcome.feedback.learning_value
                ))
            )),
        }
    }

    /// Format the effective weight table.
    pub fn format_weights(&self, snapshot: &WeightSnapshot, records: &[WeightRecord]) -> Result<String> {
        let calibrated_at = |ft| {
            records
                .iter()
                .find(|r| r.feature_type == ft)
                .and_then(|r| r.last_calibrated_at)
        };

        match self.format {
            OutputFormat::Json => {
                let weights: Vec<Value> = snapshot
                    .effective()
                    .into_iter()
                    .map(|(ft, weight)| {
                        json!({
                            "feature_type": ft.as_str(),
                            "weight": weight,
                            "default": ft.default_weight(),
                            "explicit": snapshot.is_explicit(ft),
                            "last_calibrated_at": calibrated_at(ft),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json!({
                    "version": snapshot.version(),
                    "weights": weights,
                }))?)
            }
            OutputFormat::Quiet => Ok(snapshot
                .effective()
                .into_iter()
                .map(|(ft, weight)| format!("{}={}", ft, weight))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Feature", "Weight", "Default", "Source", "Calibrated"]);
                for (ft, weight) in snapshot.effective() {
                    let source = if snapshot.is_explicit(ft) { "stored" } else { "default" };
                    let calibrated = calibrated_at(ft).map(|t| t.to_string()).unwrap_or_default();
                    builder.push_record([
                        ft.as_str().to_string(),
                        format!("{:.4}", weight),
                        format!("{:.2}", ft.default_weight()),
                        source.to_string(),
                        calibrated,
                    ]);
                }
                Ok(format!(
                    "{}\n{}",
                    self.styled(builder),
                    self.info(&format!("Weight version {}", snapshot.version()))
                ))
            }
        }
    }

    /// Format the history of one feature type.
    pub fn format_history(&self, entries: &[WeightHistoryEntry]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let items: Vec<Value> = entries
                    .iter()
                    .map(|e| {
                        json!({
                            "feature_type": e.feature_type.as_str(),
                            "previous_weight": e.previous_weight,
                            "weight": e.weight,
                            "version": e.version,
                            "reason": e.reason.as_str(),
                            "changed_at": e.changed_at,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&items)?)
            }
            OutputFormat::Quiet => Ok(entries
                .iter()
                .map(|e| format!("{} {}", e.version, e.weight))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if entries.is_empty() {
                    return Ok(self.colorize("No weight changes recorded.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Version", "Previous", "Weight", "Reason", "Changed at"]);
                for e in entries {
                    builder.push_record([
                        e.version.to_string(),
                        format!("{:.4}", e.previous_weight),
                        format!("{:.4}", e.weight),
                        e.reason.as_str().to_string(),
                        e.changed_at.to_string(),
                    ]);
                }
                Ok(self.styled(builder))
            }
        }
    }

    /// Format a recalibration report.
    pub fn format_report(&self, report: &CalibrationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let adjustments: Vec<Value> = report
                    .adjustments
                    .iter()
                    .map(|a| {
                        json!({
                            "feature_type": a.feature_type.as_str(),
                            "old_weight": a.old_weight,
                            "new_weight": a.new_weight,
                            "delta": a.delta,
                            "samples": a.samples,
                        })
                    })
                    .collect();
                let failed: Vec<Value> = report
                    .failed
                    .iter()
                    .map(|(ft, e)| json!({ "feature_type": ft.as_str(), "error": e }))
                    .collect();
                Ok(serde_json::to_string_pretty(&json!({
                    "version_before": report.version_before,
                    "version_after": report.version_after,
                    "feedback_consumed": report.feedback_consumed,
                    "samples_excluded": report.samples_excluded,
                    "adjustments": adjustments,
                    "skipped": report.skipped.iter().map(|ft| ft.as_str()).collect::<Vec<_>>(),
                    "failed": failed,
                    "attempts": report.attempts,
                    "dry_run": report.dry_run,
                    "cursor": report.cursor,
                }))?)
            }
            OutputFormat::Quiet => Ok(report.summary()),
            OutputFormat::Table => {
                let mut out = Vec::new();
                if !report.adjustments.is_empty() {
                    let mut builder = Builder::default();
                    builder.push_record(["Feature", "Old", "New", "Delta", "Samples"]);
                    for a in &report.adjustments {
                        builder.push_record([
                            a.feature_type.as_str().to_string(),
                            format!("{:.4}", a.old_weight),
                            format!("{:.4}", a.new_weight),
                            format!("{:+.4}", a.delta),
                            a.samples.to_string(),
                        ]);
                    }
                    out.push(self.styled(builder));
                }
                for (ft, error) in &report.failed {
                    out.push(self.error(&format!("{}: {}", ft, error)));
                }
                let summary = report.summary();
                out.push(if report.changed() {
                    self.success(&summary)
                } else {
                    self.info(&summary)
                });
                Ok(out.join("\n"))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn suggestions_table(&self, suggestions: &[Suggestion]) -> String {
        if suggestions.is_empty() {
            return self.colorize("No suggestions found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record([
            "ID", "Scope", "Source", "Target", "Type", "Confidence", "Strength", "Priority", "Method",
            "Status",
        ]);

        for s in suggestions {
            builder.push_record([
                s.id.to_string(),
                s.scope.clone(),
                s.source_entity_id.to_string(),
                s.target_entity_id.to_string(),
                s.relationship_type.as_str().to_string(),
                format!("{:.1}", s.confidence.value()),
                format!("{:.1}", s.strength.value()),
                format!("{:.1}", s.priority.value()),
                s.method.to_string(),
                self.status(s.status),
            ]);
        }

        self.styled(builder)
    }

    fn features_table(&self, features: &[Feature]) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Feature", "Value", "Weight", "Contribution"]);
        for f in features {
            builder.push_record([
                f.feature_type.as_str().to_string(),
                format!("{:.3}", f.value),
                format!("{:.3}", f.weight),
                format!("{:.3}", f.value * f.weight),
            ]);
        }
        self.styled(builder)
    }

    fn styled(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn status(&self, status: SuggestionStatus) -> String {
        let color = match status {
            SuggestionStatus::Pending => "yellow",
            SuggestionStatus::Accepted | SuggestionStatus::Modified => "green",
            SuggestionStatus::AutoAccepted => "cyan",
            SuggestionStatus::Rejected => "red",
        };
        self.colorize(status.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn suggestion_json(s: &Suggestion) -> Value {
    json!({
        "id": s.id.to_string(),
        "scope": s.scope,
        "source_entity_id": s.source_entity_id.0,
        "target_entity_id": s.target_entity_id.0,
        "relationship_type": s.relationship_type.as_str(),
        "confidence": s.confidence.value(),
        "confidence_label": s.confidence_label().as_str(),
        "strength": s.strength.value(),
        "priority": s.priority.value(),
        "method": s.method.as_str(),
        "status": s.status.as_str(),
        "reasoning": s.reasoning,
        "evidence": s.evidence,
        "created_at": s.created_at,
        "updated_at": s.updated_at,
        "reviewed_by": s.reviewed_by,
        "reviewed_at": s.reviewed_at,
    })
}

fn feature_json(f: &Feature) -> Value {
    json!({
        "feature_type": f.feature_type.as_str(),
        "value": f.value,
        "weight": f.weight,
        "metadata": f.metadata,
    })
}

fn feedback_json(f: &Feedback) -> Value {
    let corrections = f.corrections.as_ref().map(|c| {
        json!({
            "relationship_type": c.relationship_type.as_ref().map(|l| l.as_str()),
            "strength": c.strength.map(|s| s.value()),
        })
    });
    json!({
        "id": f.id.to_string(),
        "action": f.action.as_str(),
        "actor": f.actor,
        "corrections": corrections,
        "feedback_text": f.feedback_text,
        "confidence_at_decision": f.confidence_at_decision.value(),
        "feature_snapshot": f.feature_snapshot.as_ref().map(|fs| fs.iter().map(feature_json).collect::<Vec<_>>()),
        "time_to_decision": f.time_to_decision,
        "decision_speed": f.decision_speed.as_str(),
        "confidence_appropriate": f.confidence_appropriate,
        "quality_score": f.quality_score.value(),
        "was_auto_accepted": f.was_auto_accepted,
        "learning_value": f.learning_value,
        "created_at": f.created_at,
    })
}
