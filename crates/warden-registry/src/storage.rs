//! # Persistent Storage Layer
//!
//! This module provides a persistence layer using Sled, an embedded database.
//! It stores one canonical record per protected artifact, enabling the
//! registry to survive restarts.
//!
//! ## Threat Model
//!
//! The storage layer defends against:
//!
//! - **Data Loss**: every write is flushed before the call returns.
//! - **Corruption**: undecodable records surface as errors, never as defaults.
//! - **History Loss**: there is no delete operation; records are only replaced.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `canonical_records` | artifact name | JSON `CanonicalRecord` | Canonical digests |
//!
//! ## Security Notes
//!
//! - File permissions should restrict the database to the warden process
//! - An editor able to rewrite this database can forge canonical digests
//!
//! ## References
//!
//! - Sled documentation: <https://sled.rs/>

use crate::models::{CanonicalRecord, RegistryError, Result};
use std::path::Path;

/// Tree name for canonical records.
const RECORD_TREE: &str = "canonical_records";

/// Wrapper around a Sled database for canonical record storage.
///
/// # Thread Safety
///
/// The underlying Sled database is thread-safe and `Storage` is cheap to
/// clone. Serializing read-modify-write sequences is the caller's job.
///
/// # Example
///
/// ```rust
/// use warden_registry::storage::Storage;
///
/// let storage = Storage::temporary().unwrap();
/// assert!(storage.load_record("tier1_core_prompt").unwrap().is_none());
/// ```
#[derive(Clone)]
pub struct Storage {
    /// The underlying Sled database.
    db: sled::Db,

    /// Tree holding serialized records.
    records: sled::Tree,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Database` if:
    /// - The path is invalid
    /// - Permissions are insufficient
    /// - The database is locked by another process or corrupted
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let records = db.open_tree(RECORD_TREE)?;

        Ok(Storage { db, records })
    }

    /// Creates a temporary in-memory storage for testing.
    ///
    /// Data is lost when the last clone is dropped.
    pub fn temporary() -> Result<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        let records = db.open_tree(RECORD_TREE)?;

        Ok(Storage { db, records })
    }

    /// Stores a record under its artifact name and flushes it to disk.
    ///
    /// An existing record for the same artifact is replaced.
    pub fn store_record(&self, record: &CanonicalRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.records.insert(record.artifact_name.as_bytes(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Loads the record for an artifact.
    ///
    /// # Returns
    ///
    /// `Some(record)` if found, `None` if the artifact was never registered.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Serialization` if the stored record is corrupted.
    pub fn load_record(&self, name: &str) -> Result<Option<CanonicalRecord>> {
        match self.records.get(name.as_bytes())? {
            Some(bytes) => {
                let record: CanonicalRecord = serde_json::from_slice(&bytes)?;
                if record.artifact_name != name {
                    return Err(RegistryError::CorruptRecord(format!(
                        "record stored under '{}' names '{}'",
                        name, record.artifact_name
                    )));
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Lists all registered artifact names in lexicographic order.
    pub fn list_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for result in self.records.iter() {
            let (key, _) = result?;
            let name = String::from_utf8(key.to_vec())
                .map_err(|e| RegistryError::CorruptRecord(e.to_string()))?;
            names.push(name);
        }

        Ok(names)
    }

    /// Checks if an artifact is registered.
    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.records.contains_key(name.as_bytes())?)
    }

    /// Returns the number of registered artifacts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no artifacts are registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flushes all pending writes to disk.
    ///
    /// # Returns
    ///
    /// The number of bytes flushed.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("records_count", &self.len())
            .finish()
    }
}
