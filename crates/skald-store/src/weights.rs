//! `WeightStore` on SQLite
//!
//! A single global version in `weight_state` is bumped by every weight
//! mutation. Calibration commits are conditional on that version, so a
//! learner that read a stale snapshot gets a conflict instead of
//! overwriting a newer weight.

use crate::codec::parse_text;
use crate::{SqliteStore, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use skald_domain::traits::{WeightCommit, WeightStore};
use skald_domain::weights::validate_weight;
use skald_domain::{
    FeatureType, WeightChangeReason, WeightHistoryEntry, WeightRecord, WeightSnapshot,
};

fn current_version(conn: &Connection) -> Result<u64, StoreError> {
    let version: i64 = conn.query_row("SELECT version FROM weight_state WHERE id = 1", [], |row| {
        row.get(0)
    })?;
    Ok(version as u64)
}

fn bump_version(conn: &Connection) -> Result<u64, StoreError> {
    conn.execute("UPDATE weight_state SET version = version + 1 WHERE id = 1", [])?;
    current_version(conn)
}

fn stored_weight(conn: &Connection, feature_type: FeatureType) -> Result<Option<f64>, StoreError> {
    let weight = conn
        .query_row(
            "SELECT weight FROM feature_weights WHERE feature_type = ?1",
            params![feature_type.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(weight)
}

fn append_history(
    conn: &Connection,
    entry: &WeightHistoryEntry,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO weight_history (feature_type, previous_weight, weight, version, reason, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.feature_type.as_str(),
            entry.previous_weight,
            entry.weight,
            entry.version as i64,
            entry.reason.as_str(),
            entry.changed_at as i64,
        ],
    )?;
    Ok(())
}

/// Calibration bookkeeping of a stored weight row
fn calibration_state(
    conn: &Connection,
    feature_type: FeatureType,
) -> Result<(Option<i64>, i64), StoreError> {
    let state = conn
        .query_row(
            "SELECT last_calibrated_at, consumed_through FROM feature_weights WHERE feature_type = ?1",
            params![feature_type.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(state.unwrap_or((None, 0)))
}

/// Write a weight at `version` and append its history row
///
/// `consumed_through` is only given by calibration commits.
fn write_weight(
    conn: &Connection,
    feature_type: FeatureType,
    weight: f64,
    version: u64,
    reason: WeightChangeReason,
    consumed_through: Option<u64>,
    at: u64,
) -> Result<WeightRecord, StoreError> {
    let previous_weight = stored_weight(conn, feature_type)?.unwrap_or_else(|| feature_type.default_weight());
    let (stored_calibrated_at, stored_consumed) = calibration_state(conn, feature_type)?;

    // Manual writes keep the calibration timestamp, resets clear it
    let last_calibrated_at = match reason {
        WeightChangeReason::Calibration => Some(at as i64),
        WeightChangeReason::Reset => None,
        WeightChangeReason::Manual => stored_calibrated_at,
    };
    // Consumed feedback stays consumed, even across a reset
    let consumed = consumed_through
        .map(|c| (c as i64).max(stored_consumed))
        .unwrap_or(stored_consumed);

    conn.execute(
        "INSERT INTO feature_weights (feature_type, weight, version, last_calibrated_at, consumed_through)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(feature_type) DO UPDATE SET
         weight = excluded.weight, version = excluded.version,
         last_calibrated_at = excluded.last_calibrated_at,
         consumed_through = excluded.consumed_through",
        params![feature_type.as_str(), weight, version as i64, last_calibrated_at, consumed],
    )?;

    append_history(
        conn,
        &WeightHistoryEntry {
            feature_type,
            previous_weight,
            weight,
            version,
            reason,
            changed_at: at,
        },
    )?;

    Ok(WeightRecord {
        feature_type,
        weight,
        version,
        last_calibrated_at: last_calibrated_at.map(|t| t as u64),
        consumed_through: consumed as u64,
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<WeightRecord> {
    let feature_type: String = row.get(0)?;
    let last_calibrated_at: Option<i64> = row.get(3)?;
    Ok(WeightRecord {
        feature_type: parse_text(0, &feature_type, FeatureType::parse, "feature type")?,
        weight: row.get(1)?,
        version: row.get::<_, i64>(2)? as u64,
        last_calibrated_at: last_calibrated_at.map(|t| t as u64),
        consumed_through: row.get::<_, i64>(4)? as u64,
    })
}

fn load_records(conn: &Connection) -> Result<Vec<WeightRecord>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT feature_type, weight, version, last_calibrated_at, consumed_through
         FROM feature_weights ORDER BY feature_type",
    )?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

impl WeightStore for SqliteStore {
    type Error = StoreError;

    fn weight(&self, feature_type: FeatureType) -> Result<f64, Self::Error> {
        Ok(stored_weight(&self.conn, feature_type)?.unwrap_or_else(|| feature_type.default_weight()))
    }

    fn set_weight(
        &mut self,
        feature_type: FeatureType,
        weight: f64,
        at: u64,
    ) -> Result<WeightRecord, Self::Error> {
        let weight = validate_weight(weight)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let version = bump_version(&tx)?;
        let record = write_weight(&tx, feature_type, weight, version, WeightChangeReason::Manual, None, at)?;
        tx.commit()?;
        Ok(record)
    }

    fn snapshot(&self) -> Result<WeightSnapshot, Self::Error> {
        // Version and records must come from the same read
        let tx = self.conn.unchecked_transaction()?;
        let version = current_version(&tx)?;
        let records = load_records(&tx)?;
        tx.commit()?;
        Ok(WeightSnapshot::from_records(version, &records))
    }

    fn weight_records(&self) -> Result<Vec<WeightRecord>, Self::Error> {
        load_records(&self.conn)
    }

    fn reset_weights(&mut self, at: u64) -> Result<WeightSnapshot, Self::Error> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let version = bump_version(&tx)?;
        let records = FeatureType::ALL
            .iter()
            .map(|&ft| {
                write_weight(&tx, ft, ft.default_weight(), version, WeightChangeReason::Reset, None, at)
            })
            .collect::<Result<Vec<_>, _>>()?;
        tx.commit()?;
        Ok(WeightSnapshot::from_records(version, &records))
    }

    fn commit_weight(
        &mut self,
        expected_version: u64,
        feature_type: FeatureType,
        weight: f64,
        consumed_through: u64,
        at: u64,
    ) -> Result<WeightCommit, Self::Error> {
        let weight = validate_weight(weight)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = current_version(&tx)?;
        if current != expected_version {
            return Ok(WeightCommit::Conflict {
                current_version: current,
            });
        }

        let version = bump_version(&tx)?;
        let record = write_weight(
            &tx,
            feature_type,
            weight,
            version,
            WeightChangeReason::Calibration,
            Some(consumed_through),
            at,
        )?;
        tx.commit()?;
        Ok(WeightCommit::Committed(record))
    }

    fn weight_history(
        &self,
        feature_type: FeatureType,
    ) -> Result<Vec<WeightHistoryEntry>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT feature_type, previous_weight, weight, version, reason, changed_at
             FROM weight_history WHERE feature_type = ?1 ORDER BY id",
        )?;

        let entries = stmt
            .query_map(params![feature_type.as_str()], |row| {
                let feature_type: String = row.get(0)?;
                let reason: String = row.get(4)?;
                Ok(WeightHistoryEntry {
                    feature_type: parse_text(0, &feature_type, FeatureType::parse, "feature type")?,
                    previous_weight: row.get(1)?,
                    weight: row.get(2)?,
                    version: row.get::<_, i64>(3)? as u64,
                    reason: parse_text(4, &reason, WeightChangeReason::parse, "reason")?,
                    changed_at: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn calibration_cursor(&self) -> Result<u64, Self::Error> {
        let cursor: i64 = self.conn.query_row(
            "SELECT calibration_cursor FROM weight_state WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(cursor as u64)
    }

    fn advance_calibration_cursor(&mut self, sequence: u64, at: u64) -> Result<(), Self::Error> {
        self.conn.execute(
            "UPDATE weight_state
             SET calibration_cursor = MAX(calibration_cursor, ?1), cursor_updated_at = ?2
             WHERE id = 1",
            params![sequence as i64, at as i64],
        )?;
        Ok(())
    }
}
