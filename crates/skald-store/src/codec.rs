//! Column encoding for domain values

use crate::StoreError;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};
use skald_domain::{Feature, FeatureType, Score};
use std::collections::BTreeMap;

/// Convert a 128-bit identifier to bytes for storage
pub(crate) fn id_to_bytes(value: u128) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Convert stored bytes back to a 128-bit identifier
pub(crate) fn bytes_to_id(bytes: &[u8]) -> Result<u128, StoreError> {
    if bytes.len() != 16 {
        return Err(StoreError::InvalidData(format!(
            "Expected 16 bytes for id, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 16];
    arr.copy_from_slice(bytes);
    Ok(u128::from_be_bytes(arr))
}

/// Wrap a decoding failure so it can surface from a row mapper
pub(crate) fn conversion_error(column: usize, ty: Type, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(err))
}

/// Parse a closed-set name stored as TEXT
pub(crate) fn parse_text<T>(
    column: usize,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
    what: &str,
) -> rusqlite::Result<T> {
    parse(value).ok_or_else(|| {
        conversion_error(
            column,
            Type::Text,
            StoreError::InvalidData(format!("Unknown {}: {}", what, value)),
        )
    })
}

/// Rebuild a score stored as REAL
pub(crate) fn score_column(column: usize, field: &'static str, value: f64) -> rusqlite::Result<Score> {
    Score::for_field(field, value).map_err(|e| conversion_error(column, Type::Real, e.into()))
}

/// Decode a JSON column
pub(crate) fn json_column<T: for<'de> Deserialize<'de>>(column: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| conversion_error(column, Type::Text, e.into()))
}

/// JSON shape of a feature inside a feedback snapshot
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredFeature {
    pub feature_type: String,
    pub value: f64,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl From<&Feature> for StoredFeature {
    fn from(feature: &Feature) -> Self {
        Self {
            feature_type: feature.feature_type.as_str().to_string(),
            value: feature.value,
            weight: feature.weight,
            metadata: feature.metadata.clone(),
        }
    }
}

impl StoredFeature {
    pub fn into_feature(self) -> Result<Feature, StoreError> {
        let feature_type = FeatureType::parse(&self.feature_type).ok_or_else(|| {
            StoreError::InvalidData(format!("Unknown feature type: {}", self.feature_type))
        })?;
        Ok(Feature::new(feature_type, self.value, self.weight)?.with_metadata(self.metadata))
    }
}

/// Encode a feature snapshot as a JSON array
pub(crate) fn encode_snapshot(features: &[Feature]) -> Result<String, StoreError> {
    let stored: Vec<StoredFeature> = features.iter().map(StoredFeature::from).collect();
    Ok(serde_json::to_string(&stored)?)
}

/// Decode a feature snapshot JSON array
pub(crate) fn decode_snapshot(column: usize, value: &str) -> rusqlite::Result<Vec<Feature>> {
    let stored: Vec<StoredFeature> = json_column(column, value)?;
    stored
        .into_iter()
        .map(|s| s.into_feature().map_err(|e| conversion_error(column, Type::Text, e)))
        .collect()
}
