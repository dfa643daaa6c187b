//! Review configuration

use serde::{Deserialize, Serialize};
use skald_domain::GenerationMethod;

use crate::ReviewError;

/// Configuration for scoring and the auto-accept policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Whether freshly scored suggestions may skip human review
    pub auto_accept_enabled: bool,

    /// Minimum confidence (0-100) for auto-acceptance
    pub auto_accept_min_confidence: f64,

    /// Generation methods eligible for auto-acceptance
    pub auto_accept_methods: Vec<String>,

    /// Actor recorded on auto-accepted feedback
    pub system_actor: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            auto_accept_enabled: true,
            auto_accept_min_confidence: 95.0,
            auto_accept_methods: vec![GenerationMethod::Hybrid.as_str().to_string()],
            system_actor: "system".to_string(),
        }
    }
}

impl ReviewConfig {
    /// Every suggestion goes to a human
    pub fn strict() -> Self {
        Self {
            auto_accept_enabled: false,
            ..Self::default()
        }
    }

    /// Lower threshold and more eligible methods
    pub fn permissive() -> Self {
        Self {
            auto_accept_min_confidence: 90.0,
            auto_accept_methods: vec![
                GenerationMethod::Hybrid.as_str().to_string(),
                GenerationMethod::Semantic.as_str().to_string(),
            ],
            ..Self::default()
        }
    }

    /// Parsed eligible methods
    pub fn eligible_methods(&self) -> Result<Vec<GenerationMethod>, ReviewError> {
        self.auto_accept_methods
            .iter()
            .map(|m| m.parse::<GenerationMethod>().map_err(ReviewError::from))
            .collect()
    }

    /// Check the configuration before use
    pub fn validate(&self) -> Result<(), ReviewError> {
        if !self.auto_accept_min_confidence.is_finite()
            || !(0.0..=100.0).contains(&self.auto_accept_min_confidence)
        {
            return Err(ReviewError::Config(format!(
                "auto_accept_min_confidence must be in [0, 100], got {}",
                self.auto_accept_min_confidence
            )));
        }
        if self.system_actor.trim().is_empty() {
            return Err(ReviewError::Config("system_actor must not be empty".to_string()));
        }
        self.eligible_methods()?;
        Ok(())
    }
}
