//! End-to-end command tests against a file-backed store

use skald_cli::cli::{IdArgs, PendingArgs, RecalibrateArgs, RejectArgs, SuggestArgs};
use skald_cli::commands;
use skald_cli::config::OutputFormat;
use skald_cli::{CliError, Formatter};
use skald_domain::traits::{SuggestionQuery, SuggestionStore, WeightStore};
use skald_domain::{FeatureType, SuggestionStatus};
use skald_learner::LearnerConfig;
use skald_review::{ReviewConfig, ReviewError, SuggestionLifecycle};
use skald_store::SqliteStore;
use std::fs;
use tempfile::TempDir;

const CANDIDATES: &str = r#"[
  {
    "scope": "saga-1", "source": 1, "target": 2, "type": "ally", "method": "hybrid",
    "strength": 85, "reasoning": "Fought side by side at the ford",
    "signals": [
      { "type": "co_occurrence", "value": 18, "min": 0, "max": 20 },
      { "type": "shared_faction", "value": 1, "min": 0, "max": 1 }
    ]
  },
  {
    "scope": "saga-1", "source": 1, "target": 3, "type": "rival", "method": "content",
    "signals": [{ "type": "mention_frequency", "value": 4, "min": 0, "max": 10 }]
  },
  {
    "scope": "saga-1", "source": 4, "target": 4, "type": "ally",
    "signals": []
  }
]"#;

fn quiet() -> Formatter {
    Formatter::new(OutputFormat::Quiet, false)
}

fn pending(store: &SqliteStore) -> Vec<skald_domain::Suggestion> {
    store
        .query_suggestions(&SuggestionQuery::pending(None))
        .unwrap()
}

#[test]
fn test_suggest_review_and_recalibrate() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("candidates.json");
    fs::write(&input, CANDIDATES).unwrap();

    let mut store = SqliteStore::new(dir.path().join("skald.db")).unwrap();
    let lifecycle = SuggestionLifecycle::new(ReviewConfig::strict()).unwrap();

    // The self-relationship is skipped, the other two are stored
    commands::execute_suggest(
        SuggestArgs {
            file: Some(input),
            stdin: false,
        },
        &mut store,
        &lifecycle,
        &quiet(),
    )
    .unwrap();
    let queue = pending(&store);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].relationship_type.as_str(), "ally");

    commands::execute_pending(
        PendingArgs {
            scope: Some("saga-1".to_string()),
            limit: None,
        },
        &store,
        &lifecycle,
        &quiet(),
    )
    .unwrap();

    let ally = queue[0].id.to_string();
    let rival = queue[1].id.to_string();
    commands::execute_accept(IdArgs { id: ally.clone() }, &mut store, &lifecycle, "alice", &quiet())
        .unwrap();
    commands::execute_reject(
        RejectArgs {
            id: rival,
            text: Some("They never met".to_string()),
        },
        &mut store,
        &lifecycle,
        "alice",
        &quiet(),
    )
    .unwrap();
    assert!(pending(&store).is_empty());

    // A second decision on the same suggestion conflicts
    let again = commands::execute_dismiss(IdArgs { id: ally }, &mut store, &lifecycle, "bob", &quiet());
    assert!(matches!(
        again,
        Err(CliError::Review(ReviewError::Conflict {
            status: SuggestionStatus::Accepted,
            ..
        }))
    ));

    commands::execute_recalibrate(
        RecalibrateArgs {
            window_hours: None,
            dry_run: false,
        },
        &mut store,
        &LearnerConfig::default(),
        &quiet(),
    )
    .unwrap();

    assert!(store.weight(FeatureType::CoOccurrence).unwrap() > 0.8);
    assert!(store.weight(FeatureType::MentionFrequency).unwrap() < 0.4);
    assert!(store.calibration_cursor().unwrap() > 0);
}

#[test]
fn test_suggest_requires_input() {
    let mut store = SqliteStore::in_memory().unwrap();
    let lifecycle = SuggestionLifecycle::default_config().unwrap();

    let result = commands::execute_suggest(
        SuggestArgs {
            file: None,
            stdin: false,
        },
        &mut store,
        &lifecycle,
        &quiet(),
    );
    assert!(matches!(result, Err(CliError::InvalidInput(_))));
}
