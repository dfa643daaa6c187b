//! `SuggestionStore` on SQLite

use crate::codec::{
    bytes_to_id, conversion_error, decode_snapshot, encode_snapshot, id_to_bytes, json_column,
    parse_text, score_column,
};
use crate::{is_constraint_violation, SqliteStore, StoreError};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use skald_domain::traits::{RecordedFeedback, SuggestionQuery, SuggestionStore, TransitionOutcome};
use skald_domain::{
    DecisionSpeed, EntityId, Feature, FeatureType, Feedback, FeedbackAction, FeedbackId,
    GenerationMethod, RelationshipLabel, Suggestion, SuggestionId, SuggestionStatus,
    UserCorrection, ValidationError,
};
use std::collections::BTreeMap;

const SUGGESTION_COLUMNS: &str = "id, scope, source_entity_id, target_entity_id, relationship_type, \
     confidence, strength, priority, method, status, reasoning, evidence, \
     created_at, updated_at, reviewed_by, reviewed_at";

const FEEDBACK_COLUMNS: &str = "sequence, id, suggestion_id, action, actor, corrected_type, \
     corrected_strength, feedback_text, confidence_at_decision, feature_snapshot, \
     time_to_decision, decision_speed, confidence_appropriate, quality_score, \
     was_auto_accepted, learning_value, created_at";

fn blob_id(row: &Row<'_>, column: usize) -> rusqlite::Result<u128> {
    let bytes: Vec<u8> = row.get(column)?;
    bytes_to_id(&bytes).map_err(|e| conversion_error(column, Type::Blob, e))
}

fn label_column(column: usize, value: &str) -> rusqlite::Result<RelationshipLabel> {
    RelationshipLabel::new(value).map_err(|e| conversion_error(column, Type::Text, e.into()))
}

fn row_to_suggestion(row: &Row<'_>) -> rusqlite::Result<Suggestion> {
    let relationship_type: String = row.get(4)?;
    let method: String = row.get(8)?;
    let status: String = row.get(9)?;
    let evidence: String = row.get(11)?;
    let reviewed_at: Option<i64> = row.get(15)?;

    Ok(Suggestion {
        id: SuggestionId::from_value(blob_id(row, 0)?),
        scope: row.get(1)?,
        source_entity_id: EntityId(row.get::<_, i64>(2)? as u64),
        target_entity_id: EntityId(row.get::<_, i64>(3)? as u64),
        relationship_type: label_column(4, &relationship_type)?,
        confidence: score_column(5, "confidence", row.get(5)?)?,
        strength: score_column(6, "strength", row.get(6)?)?,
        priority: score_column(7, "priority", row.get(7)?)?,
        method: parse_text(8, &method, GenerationMethod::parse, "method")?,
        status: parse_text(9, &status, SuggestionStatus::parse, "status")?,
        reasoning: row.get(10)?,
        evidence: json_column(11, &evidence)?,
        created_at: row.get::<_, i64>(12)? as u64,
        updated_at: row.get::<_, i64>(13)? as u64,
        reviewed_by: row.get(14)?,
        reviewed_at: reviewed_at.map(|t| t as u64),
    })
}

fn row_to_feature(row: &Row<'_>) -> rusqlite::Result<Feature> {
    let feature_type: String = row.get(0)?;
    let metadata: String = row.get(3)?;
    let feature_type = parse_text(0, &feature_type, FeatureType::parse, "feature type")?;
    let metadata: BTreeMap<String, String> = json_column(3, &metadata)?;

    Feature::new(feature_type, row.get(1)?, row.get(2)?)
        .map(|f| f.with_metadata(metadata))
        .map_err(|e| conversion_error(1, Type::Real, e.into()))
}

fn row_to_feedback(row: &Row<'_>) -> rusqlite::Result<RecordedFeedback> {
    let action: String = row.get(3)?;
    let corrected_type: Option<String> = row.get(5)?;
    let corrected_strength: Option<f64> = row.get(6)?;
    let snapshot: Option<String> = row.get(9)?;
    let speed: String = row.get(11)?;

    let corrections = UserCorrection {
        relationship_type: corrected_type
            .map(|t| label_column(5, &t))
            .transpose()?,
        strength: corrected_strength
            .map(|s| score_column(6, "corrected_strength", s))
            .transpose()?,
    };

    let feedback = Feedback {
        id: FeedbackId::from_value(blob_id(row, 1)?),
        suggestion_id: SuggestionId::from_value(blob_id(row, 2)?),
        action: parse_text(3, &action, FeedbackAction::parse, "action")?,
        actor: row.get(4)?,
        corrections: (!corrections.is_empty()).then_some(corrections),
        feedback_text: row.get(7)?,
        confidence_at_decision: score_column(8, "confidence_at_decision", row.get(8)?)?,
        feature_snapshot: snapshot.map(|s| decode_snapshot(9, &s)).transpose()?,
        time_to_decision: row.get::<_, i64>(10)? as u64,
        decision_speed: parse_text(11, &speed, DecisionSpeed::parse, "decision speed")?,
        confidence_appropriate: row.get(12)?,
        quality_score: score_column(13, "quality_score", row.get(13)?)?,
        was_auto_accepted: row.get(14)?,
        learning_value: row.get(15)?,
        created_at: row.get::<_, i64>(16)? as u64,
    };

    Ok(RecordedFeedback {
        sequence: row.get::<_, i64>(0)? as u64,
        feedback,
    })
}

fn insert_feedback(conn: &rusqlite::Connection, feedback: &Feedback) -> Result<(), StoreError> {
    let corrections = feedback.corrections.as_ref();
    let snapshot = feedback
        .feature_snapshot
        .as_deref()
        .map(encode_snapshot)
        .transpose()?;

    conn.execute(
        "INSERT INTO feedback (id, suggestion_id, action, actor, corrected_type, corrected_strength,
             feedback_text, confidence_at_decision, feature_snapshot, time_to_decision,
             decision_speed, confidence_appropriate, quality_score, was_auto_accepted,
             learning_value, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            id_to_bytes(feedback.id.value()),
            id_to_bytes(feedback.suggestion_id.value()),
            feedback.action.as_str(),
            &feedback.actor,
            corrections.and_then(|c| c.relationship_type.as_ref().map(|l| l.as_str().to_string())),
            corrections.and_then(|c| c.strength.map(|s| s.value())),
            &feedback.feedback_text,
            feedback.confidence_at_decision.value(),
            snapshot,
            feedback.time_to_decision as i64,
            feedback.decision_speed.as_str(),
            feedback.confidence_appropriate,
            feedback.quality_score.value(),
            feedback.was_auto_accepted,
            feedback.learning_value,
            feedback.created_at as i64,
        ],
    )?;
    Ok(())
}

fn check_feedback_target(suggestion: &Suggestion, feedback: &Feedback) -> Result<(), StoreError> {
    if feedback.suggestion_id != suggestion.id {
        return Err(StoreError::InvalidData(format!(
            "Feedback {} belongs to suggestion {}, not {}",
            feedback.id, feedback.suggestion_id, suggestion.id
        )));
    }
    if !(0.0..=1.0).contains(&feedback.learning_value) {
        return Err(ValidationError::OutOfRange {
            field: "learning_value",
            value: feedback.learning_value,
            min: 0.0,
            max: 1.0,
        }
        .into());
    }
    Ok(())
}

impl SuggestionStore for SqliteStore {
    type Error = StoreError;

    fn insert_suggestion(
        &mut self,
        suggestion: &Suggestion,
        features: &[Feature],
        feedback: Option<&Feedback>,
    ) -> Result<(), Self::Error> {
        suggestion.validate()?;
        for feature in features {
            feature.validate()?;
        }
        match (suggestion.status.is_terminal(), feedback) {
            (true, None) => {
                return Err(StoreError::InvalidData(format!(
                    "Suggestion {} created as {} without feedback",
                    suggestion.id, suggestion.status
                )))
            }
            (false, Some(_)) => {
                return Err(StoreError::InvalidData(format!(
                    "Pending suggestion {} cannot carry feedback",
                    suggestion.id
                )))
            }
            (_, Some(feedback)) => check_feedback_target(suggestion, feedback)?,
            (false, None) => {}
        }

        let id_bytes = id_to_bytes(suggestion.id.value());
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT INTO suggestions (id, scope, source_entity_id, target_entity_id, relationship_type,
                 confidence, strength, priority, method, status, reasoning, evidence,
                 created_at, updated_at, reviewed_by, reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                &id_bytes,
                &suggestion.scope,
                suggestion.source_entity_id.0 as i64,
                suggestion.target_entity_id.0 as i64,
                suggestion.relationship_type.as_str(),
                suggestion.confidence.value(),
                suggestion.strength.value(),
                suggestion.priority.value(),
                suggestion.method.as_str(),
                suggestion.status.as_str(),
                &suggestion.reasoning,
                serde_json::to_string(&suggestion.evidence)?,
                suggestion.created_at as i64,
                suggestion.updated_at as i64,
                &suggestion.reviewed_by,
                suggestion.reviewed_at.map(|t| t as i64),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(StoreError::Duplicate(format!(
                    "{} {} -[{}]-> {}",
                    suggestion.scope,
                    suggestion.source_entity_id,
                    suggestion.relationship_type,
                    suggestion.target_entity_id
                )))
            }
            Err(e) => return Err(e.into()),
        }

        for feature in features {
            tx.execute(
                "INSERT INTO features (suggestion_id, feature_type, value, weight, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &id_bytes,
                    feature.feature_type.as_str(),
                    feature.value,
                    feature.weight,
                    serde_json::to_string(&feature.metadata)?,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::Validation(ValidationError::DuplicateFeature(
                        feature.feature_type.as_str().to_string(),
                    ))
                } else {
                    e.into()
                }
            })?;
        }

        if let Some(feedback) = feedback {
            insert_feedback(&tx, feedback)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>, Self::Error> {
        let suggestion = self
            .conn
            .query_row(
                &format!("SELECT {} FROM suggestions WHERE id = ?1", SUGGESTION_COLUMNS),
                params![id_to_bytes(id.value())],
                row_to_suggestion,
            )
            .optional()?;

        Ok(suggestion)
    }

    fn get_features(&self, id: SuggestionId) -> Result<Vec<Feature>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT feature_type, value, weight, metadata
             FROM features WHERE suggestion_id = ?1 ORDER BY feature_type",
        )?;

        let features = stmt
            .query_map(params![id_to_bytes(id.value())], row_to_feature)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    fn query_suggestions(&self, query: &SuggestionQuery) -> Result<Vec<Suggestion>, Self::Error> {
        let mut sql = format!("SELECT {} FROM suggestions WHERE 1=1", SUGGESTION_COLUMNS);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(scope) = &query.scope {
            sql.push_str(" AND scope = ?");
            params.push(Box::new(scope.clone()));
        }

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(min_priority) = query.min_priority {
            sql.push_str(" AND priority >= ?");
            params.push(Box::new(min_priority));
        }

        sql.push_str(" ORDER BY priority DESC, created_at ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let suggestions = stmt
            .query_map(&param_refs[..], row_to_suggestion)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(suggestions)
    }

    fn apply_transition(
        &mut self,
        updated: &Suggestion,
        feedback: &Feedback,
    ) -> Result<TransitionOutcome, Self::Error> {
        if !updated.status.is_terminal() {
            return Err(ValidationError::InvalidTransition {
                from: SuggestionStatus::Pending.as_str().to_string(),
                to: updated.status.as_str().to_string(),
            }
            .into());
        }
        check_feedback_target(updated, feedback)?;

        let id_bytes = id_to_bytes(updated.id.value());
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE suggestions
             SET status = ?2, updated_at = ?3, reviewed_by = ?4, reviewed_at = ?5,
                 relationship_type = ?6, strength = ?7
             WHERE id = ?1 AND status = 'pending'",
            params![
                &id_bytes,
                updated.status.as_str(),
                updated.updated_at as i64,
                &updated.reviewed_by,
                updated.reviewed_at.map(|t| t as i64),
                updated.relationship_type.as_str(),
                updated.strength.value(),
            ],
        )?;

        if changed == 0 {
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM suggestions WHERE id = ?1",
                    params![&id_bytes],
                    |row| row.get(0),
                )
                .optional()?;

            // Dropping the transaction rolls it back
            return match current {
                None => Ok(TransitionOutcome::NotFound),
                Some(status) => SuggestionStatus::parse(&status)
                    .map(TransitionOutcome::NotPending)
                    .ok_or_else(|| StoreError::InvalidData(format!("Unknown status: {}", status))),
            };
        }

        insert_feedback(&tx, feedback)?;
        tx.commit()?;
        Ok(TransitionOutcome::Applied)
    }

    fn get_feedback(&self, id: SuggestionId) -> Result<Option<Feedback>, Self::Error> {
        let recorded = self
            .conn
            .query_row(
                &format!("SELECT {} FROM feedback WHERE suggestion_id = ?1", FEEDBACK_COLUMNS),
                params![id_to_bytes(id.value())],
                row_to_feedback,
            )
            .optional()?;

        Ok(recorded.map(|r| r.feedback))
    }

    fn feedback_after(
        &self,
        after_sequence: u64,
        created_since: Option<u64>,
    ) -> Result<Vec<RecordedFeedback>, Self::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM feedback
             WHERE sequence > ?1 AND (?2 IS NULL OR created_at >= ?2)
             ORDER BY sequence",
            FEEDBACK_COLUMNS
        ))?;

        let records = stmt
            .query_map(
                params![after_sequence as i64, created_since.map(|t| t as i64)],
                row_to_feedback,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
