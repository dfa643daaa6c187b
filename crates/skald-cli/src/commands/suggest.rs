//! Suggest command implementation.
//!
//! Reads candidates together with their raw signals, so the input file acts
//! as the feature extraction service:
//!
//! ```json
//! [{
//!   "scope": "saga-1", "source": 1, "target": 2, "type": "ally",
//!   "method": "hybrid", "strength": 85,
//!   "reasoning": "Fought side by side at the ford",
//!   "signals": [{ "type": "co_occurrence", "value": 18, "min": 0, "max": 20 }]
//! }]
//! ```

use crate::cli::SuggestArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use serde::Deserialize;
use skald_domain::traits::{FeatureExtractor, Reasoner, Reasoning};
use skald_domain::{Candidate, EntityId, Feature, FeatureType, GenerationMethod, RawSignal, RelationshipLabel};
use skald_review::SuggestionLifecycle;
use skald_store::SqliteStore;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs;
use std::io::{self, Read};

/// Execute the suggest command.
///
/// One bad candidate is reported and skipped; the rest are still stored.
pub fn execute_suggest(
    args: SuggestArgs,
    store: &mut SqliteStore,
    lifecycle: &SuggestionLifecycle,
    formatter: &Formatter,
) -> Result<()> {
    // Read candidates from file or stdin
    let json_data = if args.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else if let Some(path) = args.file {
        fs::read_to_string(path)?
    } else {
        return Err(CliError::InvalidInput(
            "Must specify either --file or --stdin".to_string(),
        ));
    };

    let definitions: Vec<CandidateDefinition> = serde_json::from_str(&json_data)?;
    if definitions.is_empty() {
        return Err(CliError::InvalidInput("No candidates provided".to_string()));
    }

    let mut created = Vec::new();
    let mut failed = 0;
    for (index, definition) in definitions.into_iter().enumerate() {
        let result = definition
            .into_parts()
            .and_then(|(candidate, signals, reasoning)| {
                Ok(lifecycle.create(store, &candidate, &signals, &reasoning)?)
            });
        match result {
            Ok(suggestion) => created.push(suggestion),
            Err(e) => {
                failed += 1;
                eprintln!("{}", formatter.error(&format!("Candidate {}: {}", index + 1, e)));
            }
        }
    }

    println!("{}", formatter.format_suggestions(&created)?);
    if failed > 0 {
        eprintln!(
            "{}",
            formatter.warning(&format!("{} of {} candidate(s) skipped", failed, failed + created.len()))
        );
    }

    Ok(())
}

/// Candidate definition for JSON input.
#[derive(Debug, Deserialize)]
struct CandidateDefinition {
    scope: String,
    source: u64,
    target: u64,
    #[serde(rename = "type")]
    relationship_type: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    signals: Vec<SignalDefinition>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    strength: Option<f64>,
    #[serde(default)]
    evidence: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SignalDefinition {
    #[serde(rename = "type")]
    feature_type: String,
    value: f64,
    min: f64,
    max: f64,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl CandidateDefinition {
    fn into_parts(self) -> Result<(Candidate, FileSignals, FileReasoning)> {
        let candidate = Candidate::new(
            self.scope,
            EntityId(self.source),
            EntityId(self.target),
            RelationshipLabel::new(&self.relationship_type)?,
            self.method.parse::<GenerationMethod>()?,
        )?;

        let signals = self
            .signals
            .into_iter()
            .map(|s| {
                Ok(RawSignal {
                    feature_type: s.feature_type.parse::<FeatureType>()?,
                    value: s.value,
                    observed_min: s.min,
                    observed_max: s.max,
                    metadata: s.metadata,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let reasoning = Reasoning {
            text: self.reasoning,
            strength: self.strength,
            evidence: self.evidence,
        };

        Ok((candidate, FileSignals(signals), FileReasoning(reasoning)))
    }
}

/// Raw signals supplied with a candidate.
struct FileSignals(Vec<RawSignal>);

impl FeatureExtractor for FileSignals {
    type Error = Infallible;

    fn extract(&self, _candidate: &Candidate) -> std::result::Result<Vec<RawSignal>, Infallible> {
        Ok(self.0.clone())
    }
}

/// Justification supplied with a candidate.
struct FileReasoning(Reasoning);

impl Reasoner for FileReasoning {
    type Error = Infallible;

    fn explain(&self, _candidate: &Candidate, _features: &[Feature]) -> std::result::Result<Reasoning, Infallible> {
        Ok(self.0.clone())
    }
}

fn default_method() -> String {
    "content".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_definition_parsing() {
        let json = r#"
        {
            "scope": "saga-1",
            "source": 1,
            "target": 2,
            "type": "Ally",
            "signals": [{ "type": "co_occurrence", "value": 18, "min": 0, "max": 20 }]
        }
        "#;

        let def: CandidateDefinition = serde_json::from_str(json).unwrap();
        let (candidate, signals, reasoning) = def.into_parts().unwrap();

        assert_eq!(candidate.relationship_type.as_str(), "ally");
        assert_eq!(candidate.method, GenerationMethod::Content);
        assert_eq!(signals.0[0].feature_type, FeatureType::CoOccurrence);
        assert!(reasoning.0.strength.is_none());
    }

    #[test]
    fn test_unknown_signal_type_rejected() {
        let json = r#"
        {
            "scope": "saga-1", "source": 1, "target": 2, "type": "ally",
            "signals": [{ "type": "telepathy", "value": 1, "min": 0, "max": 1 }]
        }
        "#;

        let def: CandidateDefinition = serde_json::from_str(json).unwrap();
        assert!(matches!(def.into_parts(), Err(CliError::Validation(_))));
    }

    #[test]
    fn test_self_relationship_rejected() {
        let json = r#"{ "scope": "saga-1", "source": 3, "target": 3, "type": "ally" }"#;

        let def: CandidateDefinition = serde_json::from_str(json).unwrap();
        assert!(def.into_parts().is_err());
    }
}
