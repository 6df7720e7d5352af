//! Row conversion for identity records.
//!
//! The identity document and the held resource roles are stored as JSON
//! text; status, sequence, and timestamps get their own columns so the
//! conditional update can compare and bump them in SQL.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use sha2::{Digest, Sha256};

use crate::models::{Identity, IdentityRecord, IdentityStatus, Meta, ResourceRole};
use crate::{Error, Result};

/// Column list shared by every `SELECT`.
pub const RECORD_COLUMNS: &str =
    "identity, status, sequence, resource_roles, created_at, updated_at";

/// Raw column values of one record.
#[derive(Debug)]
pub struct RecordRow {
    identity: String,
    status: String,
    sequence: i64,
    resource_roles: String,
    created_at: String,
    updated_at: String,
}

impl RecordRow {
    /// Reads the [`RECORD_COLUMNS`] of a row.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity: row.get(0)?,
            status: row.get(1)?,
            sequence: row.get(2)?,
            resource_roles: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    /// Decodes the row into a record.
    pub fn into_record(self) -> Result<IdentityRecord> {
        let identity: Identity = decode_json("decode_identity", &self.identity)?;
        let sys_resource_role: Vec<ResourceRole> =
            decode_json("decode_resource_roles", &self.resource_roles)?;
        let status = IdentityStatus::parse(&self.status).ok_or_else(|| corrupt(
            "decode_status",
            format!("unknown status '{}'", self.status),
        ))?;
        let sequence = u64::try_from(self.sequence)
            .map_err(|e| corrupt("decode_sequence", e.to_string()))?;
        Ok(IdentityRecord {
            identity,
            meta: Meta {
                status,
                sequence,
                sys_resource_role,
                created: parse_timestamp(&self.created_at)?,
                updated: parse_timestamp(&self.updated_at)?,
            },
        })
    }
}

/// Hex-encoded SHA-256 of an identity ID, used as the record key.
pub fn id_hash(id: &str) -> String {
    hex::encode(Sha256::digest(id.as_bytes()))
}

/// Encodes a value as JSON text.
pub fn encode_json<T: serde::Serialize>(operation: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    })
}

/// Converts a sequence to the `SQLite` integer type.
pub fn sequence_param(sequence: u64) -> Result<i64> {
    i64::try_from(sequence).map_err(|e| Error::InvalidInput(format!("sequence {sequence}: {e}")))
}

/// Formats a timestamp for storage.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn decode_json<T: serde::de::DeserializeOwned>(operation: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| corrupt(operation, e.to_string()))
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| corrupt("decode_timestamp", e.to_string()))
}

fn corrupt(operation: &str, cause: String) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_hash_is_stable_hex() {
        let hash = id_hash("https://example.com/i/alpha");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, id_hash("https://example.com/i/alpha"));
        assert_ne!(hash, id_hash("https://example.com/i/beta"));
    }

    #[test]
    fn test_sequence_param_rejects_overflow() {
        assert!(sequence_param(u64::MAX).is_err());
        assert_eq!(sequence_param(3).ok(), Some(3));
    }
}
