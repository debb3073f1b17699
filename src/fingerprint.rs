//! Table fingerprints and per-cycle snapshots.
//!
//! A table's fingerprint is the SHA-256 of the compact JSON document
//! `{"count": <rows>, "data": [<row>, ...]}` with rows ordered by `id`.
//! The explicit count means a deletion always changes the digest even if
//! the remaining rows serialize identically.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::ports::store::{StoreConnection, TableRows};

/// Reason recorded for an unknown fingerprint loaded from the state file.
const PERSISTED_UNKNOWN: &str = "unreadable when state was last written";

/// Content fingerprint of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// Hex-encoded SHA-256 digest of the table contents.
    Known(String),
    /// The table could not be read; carries the reason for logging.
    Unknown(String),
}

impl Fingerprint {
    /// Whether moving from `previous` to `self` counts as a change.
    ///
    /// Two unknowns compare equal so a table that stays unreadable does not
    /// trigger a rebuild every cycle; any transition between known and
    /// unknown is a change.
    #[must_use]
    pub fn differs_from(&self, previous: &Fingerprint) -> bool {
        match (previous, self) {
            (Self::Known(old), Self::Known(new)) => old != new,
            (Self::Unknown(_), Self::Unknown(_)) => false,
            _ => true,
        }
    }

    /// The digest, if known.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        match self {
            Self::Known(digest) => Some(digest),
            Self::Unknown(_) => None,
        }
    }
}

// Persisted as a digest string or `null`; the unknown reason is not kept.
impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.digest().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?
            .map_or_else(|| Self::Unknown(PERSISTED_UNKNOWN.to_string()), Self::Known))
    }
}

/// Computes the fingerprint digest for a full, id-ordered row set.
#[must_use]
pub fn fingerprint_rows(rows: &TableRows) -> String {
    let mut canonical = Map::new();
    canonical.insert("count".to_string(), Value::from(rows.len()));
    let data = rows.iter().cloned().map(Value::Object).collect();
    canonical.insert("data".to_string(), Value::Array(data));
    let bytes = Value::Object(canonical).to_string();
    hex::encode(Sha256::digest(bytes.as_bytes()))
}

/// One monitored table as observed in a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Name of the monitored table.
    pub table_name: String,
    /// Number of rows read, `None` when the table was unreadable.
    pub row_count: Option<usize>,
    /// Fingerprint of the rows read.
    pub fingerprint: Fingerprint,
}

/// Fingerprints of every monitored table, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Per-table results.
    pub tables: Vec<TableSnapshot>,
}

impl Snapshot {
    /// Table name → fingerprint, as persisted in the state file.
    #[must_use]
    pub fn checksums(&self) -> BTreeMap<String, Fingerprint> {
        self.tables
            .iter()
            .map(|t| (t.table_name.clone(), t.fingerprint.clone()))
            .collect()
    }

    /// Looks up one table's fingerprint.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&Fingerprint> {
        self.tables
            .iter()
            .find(|t| t.table_name == table)
            .map(|t| &t.fingerprint)
    }
}

/// Reads and fingerprints every table in `tables`.
///
/// A table that fails to read becomes [`Fingerprint::Unknown`] and the
/// remaining tables are still read.
#[must_use]
pub fn take_snapshot(conn: &dyn StoreConnection, tables: &[String]) -> Snapshot {
    let tables = tables
        .iter()
        .map(|table| match conn.read_table(table) {
            Ok(rows) => TableSnapshot {
                table_name: table.clone(),
                row_count: Some(rows.len()),
                fingerprint: Fingerprint::Known(fingerprint_rows(&rows)),
            },
            Err(e) => {
                warn!("Failed to fingerprint table {table}: {e}");
                TableSnapshot {
                    table_name: table.clone(),
                    row_count: None,
                    fingerprint: Fingerprint::Unknown(e.to_string()),
                }
            }
        })
        .collect();
    Snapshot { tables }
}
