//! # Canonical Registry - Main Facade
//!
//! One source of truth per artifact: the digest that was explicitly accepted
//! as authoritative, plus who accepted it and when. The registry is an owned
//! component with an explicit open/flush lifecycle, passed by reference to
//! whoever needs it.
//!
//! ## Usage Flow
//!
//! 1. **Initialization**: Open the registry with a database path
//! 2. **Lookup**: `get(name)` before each validation; `None` means bootstrap
//! 3. **Acceptance**: `put(..)` when content is explicitly accepted
//! 4. **Restoration**: `record_restoration(name)` after a verified repair

use crate::models::{CanonicalRecord, Result, SectionHash, AUTO_RESTORE_ACTOR};
use crate::storage::Storage;
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};

/// The Canonical Registry interface.
///
/// # Thread Safety
///
/// Individual calls are safe from any thread. A `get` followed by a `put`
/// is not atomic; callers that validate and then write must hold a
/// per-artifact lock across the sequence.
///
/// # Example
///
/// ```rust
/// use warden_registry::{CanonicalRegistry, canonical::digest_section};
///
/// let registry = CanonicalRegistry::temporary().unwrap();
/// assert!(registry.get("tier1_core_prompt").unwrap().is_none());
///
/// let digest = digest_section("ANALYSIS GUIDELINES:");
/// registry.put("tier1_core_prompt", digest, "Tier 1 prompt", "alice").unwrap();
///
/// let record = registry.get("tier1_core_prompt").unwrap().unwrap();
/// assert_eq!(record.canonical_digest, digest);
/// assert_eq!(record.updated_by, "alice");
/// ```
#[derive(Clone)]
pub struct CanonicalRegistry {
    /// Persistent record storage.
    storage: Storage,
}

impl CanonicalRegistry {
    /// Opens or creates a registry at the given database path.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Database` if the database cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::open(path)?;
        debug!(records = storage.len(), "Canonical registry opened");
        Ok(CanonicalRegistry { storage })
    }

    /// Creates a temporary in-memory registry for testing.
    pub fn temporary() -> Result<Self> {
        Ok(CanonicalRegistry {
            storage: Storage::temporary()?,
        })
    }

    /// Looks up the canonical record for an artifact.
    ///
    /// # Returns
    ///
    /// `None` if the artifact has never been registered.
    pub fn get(&self, name: &str) -> Result<Option<CanonicalRecord>> {
        self.storage.load_record(name)
    }

    /// Writes a canonical digest for an artifact.
    ///
    /// Creates the record on first registration; otherwise replaces the
    /// digest while preserving `registered_at`.
    ///
    /// # Security Notes
    ///
    /// Only call this with a digest that has been explicitly accepted:
    /// first-run bootstrap or an authorized human action.
    pub fn put(
        &self,
        name: &str,
        digest: SectionHash,
        description: &str,
        updated_by: &str,
    ) -> Result<CanonicalRecord> {
        let now = Utc::now();
        let registered_at = match self.storage.load_record(name)? {
            Some(existing) => existing.registered_at,
            None => now,
        };

        let record = CanonicalRecord {
            artifact_name: name.to_string(),
            canonical_digest: digest,
            description: description.to_string(),
            registered_at,
            updated_at: now,
            updated_by: updated_by.to_string(),
        };

        self.storage.store_record(&record)?;
        info!(
            artifact = name,
            digest = %digest.short(),
            updated_by,
            "Canonical digest recorded"
        );

        Ok(record)
    }

    /// Marks a verified restoration on an existing record.
    ///
    /// Advances `updated_at` and sets `updated_by` to the auto-restore actor.
    /// The digest is left untouched.
    ///
    /// # Returns
    ///
    /// The updated record, or `None` if the artifact is not registered.
    pub fn record_restoration(&self, name: &str) -> Result<Option<CanonicalRecord>> {
        let Some(mut record) = self.storage.load_record(name)? else {
            return Ok(None);
        };

        record.updated_at = Utc::now();
        record.updated_by = AUTO_RESTORE_ACTOR.to_string();
        self.storage.store_record(&record)?;

        Ok(Some(record))
    }

    /// Lists every canonical record, ordered by artifact name.
    pub fn records(&self) -> Result<Vec<CanonicalRecord>> {
        let mut records = Vec::new();
        for name in self.storage.list_names()? {
            if let Some(record) = self.storage.load_record(&name)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Checks if an artifact is registered.
    pub fn contains(&self, name: &str) -> Result<bool> {
        self.storage.contains(name)
    }

    /// Returns the number of registered artifacts.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns true if no artifacts are registered.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for CanonicalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalRegistry")
            .field("records_count", &self.len())
            .finish()
    }
}
