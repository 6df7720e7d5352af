//! Identity store backends.

mod sqlite;

pub use sqlite::SqliteIdentityStore;
