//! Command implementations.

pub mod init;
pub mod learn;
pub mod review;
pub mod suggest;
pub mod weights;

pub use self::init::execute_init;
pub use self::learn::{execute_recalibrate, execute_worker};
pub use self::review::{
    execute_accept, execute_dismiss, execute_modify, execute_pending, execute_reject, execute_show,
};
pub use self::suggest::execute_suggest;
pub use self::weights::execute_weights;

use crate::error::{CliError, Result};
use skald_domain::{FeatureType, SuggestionId};

/// Parse a suggestion id argument.
pub(crate) fn parse_id(id: &str) -> Result<SuggestionId> {
    SuggestionId::from_string(id).map_err(|e| CliError::InvalidInput(format!("Invalid ID '{}': {}", id, e)))
}

/// Parse a feature type argument.
pub(crate) fn parse_feature_type(name: &str) -> Result<FeatureType> {
    Ok(name.parse::<FeatureType>()?)
}
