//! Live data store backed by a SQLite file, opened read-only.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Map, Number, Value};

use crate::error::StoreError;
use crate::ports::store::{DataStore, StoreConnection, TableRows};

/// Opens a fresh read-only connection to a SQLite database each cycle.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Creates a store for the database file at `path`.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl DataStore for SqliteStore {
    fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        let open_err = |e: rusqlite::Error| StoreError::Unreachable {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;
        // Opening is lazy; touch the schema so a corrupt or non-database file
        // fails here instead of as a read error on every table.
        let touch = "SELECT count(*) FROM sqlite_master";
        conn.query_row(touch, [], |row| row.get::<_, i64>(0))
            .map_err(open_err)?;

        Ok(Box::new(SqliteConnection { conn }))
    }
}

struct SqliteConnection {
    conn: Connection,
}

impl StoreConnection for SqliteConnection {
    fn read_table(&self, table: &str) -> Result<TableRows, StoreError> {
        let read_err = |e: rusqlite::Error| StoreError::TableRead {
            table: table.to_string(),
            reason: e.to_string(),
        };

        let sql = format!("SELECT * FROM {} ORDER BY id", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql).map_err(read_err)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map([], |row| {
                let mut record = Map::new();
                for (idx, name) in columns.iter().enumerate() {
                    record.insert(name.clone(), to_json(row.get_ref(idx)?));
                }
                Ok(record)
            })
            .map_err(read_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(read_err)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Maps a SQLite value to JSON without collisions.
///
/// Plain JSON strings only ever come from valid UTF-8 TEXT. BLOBs, TEXT that
/// is not UTF-8 and non-finite REALs are wrapped in single-key objects whose
/// key names the storage class, so no two distinct values share an encoding.
fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => match Number::from_f64(f) {
            Some(n) => Value::Number(n),
            None => json!({ "$real": f.to_string() }),
        },
        ValueRef::Text(t) => match std::str::from_utf8(t) {
            Ok(text) => Value::String(text.to_owned()),
            Err(_) => json!({ "$text": hex::encode(t) }),
        },
        ValueRef::Blob(b) => json!({ "$blob": hex::encode(b) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint_rows;

    fn seeded_db() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE projects (id INTEGER PRIMARY KEY, slug TEXT, ratio REAL, cover BLOB);
             INSERT INTO projects VALUES (2, 'villa', 0.5, x'CAFE');
             INSERT INTO projects VALUES (1, 'tower', NULL, NULL);",
        )
        .unwrap();
        (dir, path)
    }

    #[test]
    fn reads_rows_ordered_by_id() {
        let (_dir, path) = seeded_db();
        let conn = SqliteStore::new(&path).connect().unwrap();

        let rows = conn.read_table("projects").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["slug"], json!("tower"));
        assert_eq!(rows[0]["ratio"], Value::Null);
        assert_eq!(rows[1]["ratio"], json!(0.5));
        assert_eq!(rows[1]["cover"], json!({ "$blob": "cafe" }));
    }

    fn digest_after(setup: &str) -> String {
        let (_dir, path) = seeded_db();
        Connection::open(&path)
            .unwrap()
            .execute_batch(setup)
            .unwrap();
        let conn = SqliteStore::new(&path).connect().unwrap();
        fingerprint_rows(&conn.read_table("projects").unwrap())
    }

    #[test]
    fn text_and_blob_with_same_hex_differ() {
        let text = digest_after("UPDATE projects SET slug = 'cafe' WHERE id = 1;");
        let blob = digest_after("UPDATE projects SET slug = x'CAFE' WHERE id = 1;");

        assert_ne!(text, blob);
    }

    #[test]
    fn distinct_invalid_utf8_text_differs() {
        let ff = digest_after("UPDATE projects SET slug = CAST(x'FF' AS TEXT)");
        let fe = digest_after("UPDATE projects SET slug = CAST(x'FE' AS TEXT)");

        assert_ne!(ff, fe);
    }

    #[test]
    fn infinite_real_is_not_null() {
        let null = digest_after("UPDATE projects SET ratio = NULL WHERE id = 2;");
        let inf = digest_after("UPDATE projects SET ratio = 9e999 WHERE id = 2;");
        let neg_inf = digest_after("UPDATE projects SET ratio = -9e999 WHERE id = 2;");

        assert_ne!(null, inf);
        assert_ne!(inf, neg_inf);
    }

    #[test]
    fn encodes_each_storage_class_distinctly() {
        assert_eq!(to_json(ValueRef::Text(b"cafe")), json!("cafe"));
        assert_eq!(
            to_json(ValueRef::Blob(&[0xca, 0xfe])),
            json!({ "$blob": "cafe" })
        );
        assert_eq!(to_json(ValueRef::Text(&[0xff])), json!({ "$text": "ff" }));
        assert_eq!(
            to_json(ValueRef::Real(f64::INFINITY)),
            json!({ "$real": "inf" })
        );
        assert_eq!(
            to_json(ValueRef::Real(f64::NEG_INFINITY)),
            json!({ "$real": "-inf" })
        );
        assert_eq!(to_json(ValueRef::Real(1.0)), json!(1.0));
        assert_ne!(to_json(ValueRef::Real(1.0)), to_json(ValueRef::Integer(1)));
    }

    #[test]
    fn missing_table_is_a_table_error() {
        let (_dir, path) = seeded_db();
        let conn = SqliteStore::new(&path).connect().unwrap();

        let err = conn.read_table("team_members").unwrap_err();

        assert!(matches!(
            err,
            StoreError::TableRead { ref table, .. } if table == "team_members"
        ));
    }

    #[test]
    fn missing_database_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteStore::new(&dir.path().join("nope.sqlite")).connect();

        assert!(matches!(result, Err(StoreError::Unreachable { .. })));
    }

    #[test]
    fn non_database_file_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.sqlite");
        std::fs::write(&path, "not a sqlite database, just some text").unwrap();

        assert!(matches!(
            SqliteStore::new(&path).connect(),
            Err(StoreError::Unreachable { .. })
        ));
    }

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
