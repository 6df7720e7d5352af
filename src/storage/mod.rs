//! Storage layer.
//!
//! The [`IdentityStore`] trait is the record-store contract the service
//! mutates through; [`SqliteIdentityStore`] is the default backend.

// Dropping the connection guard slightly earlier buys nothing here.
#![allow(clippy::significant_drop_tightening)]

pub mod identity;
pub mod sqlite;
pub mod traits;

pub use identity::SqliteIdentityStore;
pub use traits::{IdentityStore, RecordMutation};

use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// File name of the identity database inside the data directory.
pub const DATABASE_FILE: &str = "identities.db";

/// Factory for identity stores.
pub struct IdentityStorageFactory;

impl IdentityStorageFactory {
    /// Opens a `SQLite` store at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub fn create_with_path(path: &Path) -> Result<Arc<dyn IdentityStore>> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| crate::Error::OperationFailed {
                operation: "create_data_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }
        tracing::debug!(path = %path.display(), "Opening identity store");
        Ok(Arc::new(SqliteIdentityStore::new(path)?))
    }

    /// Creates an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn create_in_memory() -> Result<Arc<dyn IdentityStore>> {
        Ok(Arc::new(SqliteIdentityStore::in_memory()?))
    }

    /// Opens the store inside the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn create_for_config(config: &crate::WardenConfig) -> Result<Arc<dyn IdentityStore>> {
        Self::create_with_path(&config.data_dir.join(DATABASE_FILE))
    }
}
