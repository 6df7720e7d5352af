//! Shared `SQLite` infrastructure for the identity store.
//!
//! - [`connection`]: lock acquisition and connection configuration
//! - [`record_row`]: row conversion and key hashing
//! - [`metrics`]: operation metrics

mod connection;
mod metrics;
mod record_row;

pub use connection::{acquire_lock, configure_connection};
pub use metrics::{record_operation_metrics, status_of};
pub use record_row::{
    RECORD_COLUMNS, RecordRow, encode_json, format_timestamp, id_hash, sequence_param,
};
