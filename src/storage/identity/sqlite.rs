//! `SQLite`-backed identity store.

use crate::models::{IdentityFilter, IdentityId, IdentityRecord};
use crate::storage::sqlite::{
    RECORD_COLUMNS, RecordRow, acquire_lock, configure_connection, encode_json, format_timestamp,
    id_hash, record_operation_metrics, sequence_param, status_of,
};
use crate::storage::traits::{IdentityStore, RecordMutation};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

/// Ids bound per `IN (...)` lookup, well under `SQLite`'s variable limit.
const FIND_MANY_CHUNK: usize = 500;

/// `SQLite` identity store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. Record-level
/// concurrency is optimistic: [`IdentityStore::conditional_update`] is a
/// single `UPDATE ... WHERE id_hash = ? AND sequence = ?`, so a writer that
/// lost the race matches zero rows instead of waiting.
///
/// # Schema
///
/// One `identities` row per record, keyed by the SHA-256 of the identity
/// ID. The identity document and resource roles are JSON text columns.
pub struct SqliteIdentityStore {
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteIdentityStore {
    /// Opens (or creates) a store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identities (
                id_hash TEXT PRIMARY KEY,
                id TEXT NOT NULL,
                identity TEXT NOT NULL,
                status TEXT NOT NULL,
                sequence INTEGER NOT NULL DEFAULT 0,
                resource_roles TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_identities_status ON identities(status);",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "create_identities_table".to_string(),
            cause: e.to_string(),
        })
    }

    /// Looks up records by id hash, `FIND_MANY_CHUNK` hashes per statement.
    fn find_chunked(conn: &Connection, hashes: &[String]) -> Result<Vec<IdentityRecord>> {
        let mut records = Vec::with_capacity(hashes.len());
        for chunk in hashes.chunks(FIND_MANY_CHUNK) {
            let placeholders = (1..=chunk.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let params: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(|h| h as &dyn rusqlite::ToSql).collect();
            records.extend(Self::query_records(
                conn,
                &format!("SELECT {RECORD_COLUMNS} FROM identities WHERE id_hash IN ({placeholders})"),
                &params,
            )?);
        }
        Ok(records)
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<IdentityRecord>> {
        let mut stmt = conn.prepare(sql).map_err(|e| Error::OperationFailed {
            operation: "prepare_query".to_string(),
            cause: e.to_string(),
        })?;
        let rows = stmt
            .query_map(params, RecordRow::from_row)
            .map_err(|e| Error::OperationFailed {
                operation: "query_identities".to_string(),
                cause: e.to_string(),
            })?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| Error::OperationFailed {
                operation: "read_identity_row".to_string(),
                cause: e.to_string(),
            })?;
            records.push(row.into_record()?);
        }
        Ok(records)
    }

    fn find_one_inner(&self, id: &IdentityId) -> Result<Option<IdentityRecord>> {
        let conn = acquire_lock(&self.conn);
        let row = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM identities WHERE id_hash = ?1"),
                params![id_hash(id.as_str())],
                RecordRow::from_row,
            )
            .optional()
            .map_err(|e| Error::OperationFailed {
                operation: "find_identity".to_string(),
                cause: e.to_string(),
            })?;
        row.map(RecordRow::into_record).transpose()
    }

    fn insert_inner(&self, record: IdentityRecord) -> Result<IdentityRecord> {
        let conn = acquire_lock(&self.conn);
        let result = conn.execute(
            "INSERT INTO identities
                (id_hash, id, identity, status, sequence, resource_roles, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id_hash(record.id().as_str()),
                record.id().as_str(),
                encode_json("encode_identity", &record.identity)?,
                record.meta.status.as_str(),
                sequence_param(record.meta.sequence)?,
                encode_json("encode_resource_roles", &record.meta.sys_resource_role)?,
                format_timestamp(&record.meta.created),
                format_timestamp(&record.meta.updated),
            ],
        );

        match result {
            Ok(_) => Ok(record),
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Err(Error::Duplicate {
                    id: record.id().to_string(),
                })
            },
            Err(e) => Err(Error::OperationFailed {
                operation: "insert_identity".to_string(),
                cause: e.to_string(),
            }),
        }
    }

    fn conditional_update_inner(
        &self,
        id: &IdentityId,
        expected_sequence: u64,
        mutation: &RecordMutation,
    ) -> Result<u64> {
        let (column, value) = match mutation {
            RecordMutation::Identity(identity) => {
                ("identity", encode_json("encode_identity", identity)?)
            },
            RecordMutation::Status(status) => ("status", status.as_str().to_string()),
            RecordMutation::ResourceRoles(roles) => (
                "resource_roles",
                encode_json("encode_resource_roles", roles)?,
            ),
        };

        let conn = acquire_lock(&self.conn);
        let matched = conn
            .execute(
                &format!(
                    "UPDATE identities
                     SET {column} = ?1, sequence = sequence + 1, updated_at = ?2
                     WHERE id_hash = ?3 AND sequence = ?4"
                ),
                params![
                    value,
                    format_timestamp(&Utc::now()),
                    id_hash(id.as_str()),
                    sequence_param(expected_sequence)?,
                ],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "conditional_update".to_string(),
                cause: e.to_string(),
            })?;
        Ok(matched as u64)
    }
}

impl IdentityStore for SqliteIdentityStore {
    #[instrument(skip(self), fields(operation = "find_one", backend = "sqlite", identity.id = %id))]
    fn find_one(&self, id: &IdentityId) -> Result<Option<IdentityRecord>> {
        let start = Instant::now();
        let result = self.find_one_inner(id);
        record_operation_metrics("find_one", start, status_of(&result));
        result
    }

    #[instrument(skip(self, ids), fields(operation = "find_many", backend = "sqlite", count = ids.len()))]
    fn find_many(&self, ids: &[IdentityId]) -> Result<Vec<IdentityRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let mut hashes: Vec<String> = ids.iter().map(|id| id_hash(id.as_str())).collect();
        // Repeated ids in different chunks would otherwise return a record twice.
        hashes.sort_unstable();
        hashes.dedup();

        let result = {
            let conn = acquire_lock(&self.conn);
            Self::find_chunked(&conn, &hashes)
        };
        record_operation_metrics("find_many", start, status_of(&result));
        result
    }

    #[instrument(skip(self, filter), fields(operation = "find", backend = "sqlite"))]
    fn find(&self, filter: &IdentityFilter) -> Result<Vec<IdentityRecord>> {
        let start = Instant::now();
        let status = filter.status.map(|s| s.as_str());
        let result = {
            let conn = acquire_lock(&self.conn);
            Self::query_records(
                &conn,
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM identities
                     WHERE (?1 IS NULL OR status = ?1)
                     ORDER BY created_at, id"
                ),
                &[&status],
            )
        }
        .map(|records| {
            records
                .into_iter()
                .filter(|record| filter.matches(record))
                .take(filter.limit.unwrap_or(usize::MAX))
                .collect()
        });
        record_operation_metrics("find", start, status_of(&result));
        result
    }

    #[instrument(skip(self, record), fields(operation = "insert", backend = "sqlite", identity.id = %record.id()))]
    fn insert(&self, record: IdentityRecord) -> Result<IdentityRecord> {
        let start = Instant::now();
        let result = self.insert_inner(record);
        record_operation_metrics("insert", start, status_of(&result));
        result
    }

    #[instrument(
        skip(self, mutation),
        fields(operation = "conditional_update", backend = "sqlite", identity.id = %id, mutation = mutation.kind())
    )]
    fn conditional_update(
        &self,
        id: &IdentityId,
        expected_sequence: u64,
        mutation: RecordMutation,
    ) -> Result<u64> {
        let start = Instant::now();
        let result = self.conditional_update_inner(id, expected_sequence, &mutation);
        record_operation_metrics("conditional_update", start, status_of(&result));
        result
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::{Identity, IdentityStatus, Meta, ResourceRole};
    use tempfile::TempDir;

    fn record(id: &str) -> IdentityRecord {
        IdentityRecord {
            identity: Identity::new(id).with_attribute("label", id),
            meta: Meta::new(
                IdentityStatus::Active,
                vec![ResourceRole::new("identity.regular").with_resource([id])],
            ),
        }
    }

    #[test]
    fn test_insert_and_find_one() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        let inserted = store.insert(record("urn:a")).unwrap();

        let found = store.find_one(&IdentityId::new("urn:a")).unwrap().unwrap();
        assert_eq!(found.identity, inserted.identity);
        assert_eq!(found.meta.sequence, 0);
        assert_eq!(found.meta.sys_resource_role, inserted.meta.sys_resource_role);
        assert!(store.find_one(&IdentityId::new("urn:missing")).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        store.insert(record("urn:a")).unwrap();
        let err = store.insert(record("urn:a")).unwrap_err();
        assert!(err.is_duplicate());
    }

    #[test]
    fn test_conditional_update_is_compare_and_swap() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        store.insert(record("urn:a")).unwrap();
        let id = IdentityId::new("urn:a");

        let matched = store
            .conditional_update(&id, 0, RecordMutation::Status(IdentityStatus::Deleted))
            .unwrap();
        assert_eq!(matched, 1);

        // stale sequence matches nothing and changes nothing
        let matched = store
            .conditional_update(&id, 0, RecordMutation::Status(IdentityStatus::Active))
            .unwrap();
        assert_eq!(matched, 0);

        let found = store.find_one(&id).unwrap().unwrap();
        assert_eq!(found.meta.sequence, 1);
        assert_eq!(found.meta.status, IdentityStatus::Deleted);
        assert!(found.meta.updated >= found.meta.created);
    }

    #[test]
    fn test_conditional_update_replaces_roles_and_identity() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        store.insert(record("urn:a")).unwrap();
        let id = IdentityId::new("urn:a");

        store
            .conditional_update(&id, 0, RecordMutation::ResourceRoles(Vec::new()))
            .unwrap();
        store
            .conditional_update(
                &id,
                1,
                RecordMutation::Identity(Identity::new("urn:a").with_attribute("label", "renamed")),
            )
            .unwrap();

        let found = store.find_one(&id).unwrap().unwrap();
        assert!(found.meta.sys_resource_role.is_empty());
        assert_eq!(found.identity.attributes["label"], "renamed");
        assert_eq!(found.meta.sequence, 2);
    }

    #[test]
    fn test_conditional_update_missing_record() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        let matched = store
            .conditional_update(
                &IdentityId::new("urn:none"),
                0,
                RecordMutation::Status(IdentityStatus::Deleted),
            )
            .unwrap();
        assert_eq!(matched, 0);
    }

    #[test]
    fn test_find_many_skips_missing() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        store.insert(record("urn:a")).unwrap();
        store.insert(record("urn:b")).unwrap();

        let found = store
            .find_many(&[
                IdentityId::new("urn:a"),
                IdentityId::new("urn:b"),
                IdentityId::new("urn:c"),
            ])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.find_many(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_find_many_past_variable_limit() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        store.insert(record("urn:a")).unwrap();
        store.insert(record("urn:b")).unwrap();

        let mut ids: Vec<IdentityId> = (0..40_000)
            .map(|i| IdentityId::new(format!("urn:missing:{i}")))
            .collect();
        ids.push(IdentityId::new("urn:a"));
        ids.push(IdentityId::new("urn:b"));
        ids.push(IdentityId::new("urn:a"));

        let mut found: Vec<String> = store
            .find_many(&ids)
            .unwrap()
            .into_iter()
            .map(|r| r.id().to_string())
            .collect();
        found.sort();
        assert_eq!(found, ["urn:a", "urn:b"]);
    }

    #[test]
    fn test_find_with_filter() {
        let store = SqliteIdentityStore::in_memory().unwrap();
        store.insert(record("urn:a")).unwrap();
        store.insert(record("urn:b")).unwrap();
        store
            .insert(IdentityRecord {
                identity: Identity::group("urn:g"),
                meta: Meta::new(IdentityStatus::Deleted, Vec::new()),
            })
            .unwrap();

        assert_eq!(store.find(&IdentityFilter::new()).unwrap().len(), 3);
        assert_eq!(
            store
                .find(&IdentityFilter::new().with_status(IdentityStatus::Active))
                .unwrap()
                .len(),
            2
        );
        let groups = store.find(&IdentityFilter::new().with_kind("Group")).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id().as_str(), "urn:g");
        assert_eq!(store.find(&IdentityFilter::new().with_limit(1)).unwrap().len(), 1);
        assert_eq!(store.count(&IdentityFilter::new()).unwrap(), 3);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("identities.db");
        {
            let store = SqliteIdentityStore::new(&path).unwrap();
            store.insert(record("urn:a")).unwrap();
        }
        let store = SqliteIdentityStore::new(&path).unwrap();
        assert!(store.exists(&IdentityId::new("urn:a")).unwrap());
        assert_eq!(store.db_path(), Some(&path));
    }
}
