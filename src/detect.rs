//! Change detection between persisted checksums and a fresh snapshot.

use std::collections::BTreeMap;

use crate::fingerprint::{Fingerprint, Snapshot};

/// Returns the tables whose fingerprint changed, in `tables` order.
///
/// Tables without a previous entry are never reported; they have nothing to
/// be compared against. Tables missing from `current` are skipped as well.
#[must_use]
pub fn detect_changes(
    previous: &BTreeMap<String, Fingerprint>,
    current: &Snapshot,
    tables: &[String],
) -> Vec<String> {
    tables
        .iter()
        .filter(|table| match (previous.get(*table), current.get(table)) {
            (Some(old), Some(new)) => new.differs_from(old),
            _ => false,
        })
        .cloned()
        .collect()
}
