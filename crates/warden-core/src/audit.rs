//! Append-only change log.
//!
//! One JSON object per line. Only `append` and reads are exposed; entries
//! are never rewritten or removed from here. Retention is an operator
//! concern.

use crate::attribution::{ActionTaken, ChangeSource};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_registry::{Journal, SectionHash};

/// One digest transition and what was done about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// When the transition was handled.
    pub timestamp: DateTime<Utc>,

    /// Artifact name.
    pub artifact_name: String,

    /// Registered digest before the transition, if any.
    pub old_digest: Option<SectionHash>,

    /// Digest the live section had when the transition was detected.
    pub new_digest: SectionHash,

    /// Attributed origin.
    pub change_source: ChangeSource,

    /// Action taken.
    pub action_taken: ActionTaken,

    /// Free-form context, including error text on failures.
    pub details: String,
}

impl ChangeLogEntry {
    /// Creates an entry stamped now.
    pub fn new(
        artifact_name: &str,
        old_digest: Option<SectionHash>,
        new_digest: SectionHash,
        change_source: ChangeSource,
        action_taken: ActionTaken,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            artifact_name: artifact_name.to_string(),
            old_digest,
            new_digest,
            change_source,
            action_taken,
            details: details.into(),
        }
    }
}

/// The change log.
#[derive(Debug)]
pub struct ChangeLog {
    journal: Journal<ChangeLogEntry>,
}

impl ChangeLog {
    /// Opens (creating if needed) the log at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            journal: Journal::open(path)?,
        })
    }

    /// Fails if an entry could not be appended right now.
    ///
    /// Called before any file or registry change that the log must record.
    pub fn ensure_writable(&self) -> Result<()> {
        self.journal.ensure_writable()?;
        Ok(())
    }

    /// Appends one entry.
    pub fn append(&self, entry: &ChangeLogEntry) -> Result<()> {
        self.journal.append(entry)?;
        Ok(())
    }

    /// All entries, oldest first.
    pub fn all(&self) -> Result<Vec<ChangeLogEntry>> {
        Ok(self.journal.read_all()?)
    }

    /// Entries for one artifact, oldest first.
    pub fn history(&self, artifact_name: &str) -> Result<Vec<ChangeLogEntry>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| e.artifact_name == artifact_name)
            .collect())
    }

    /// Log location.
    pub fn path(&self) -> &Path {
        self.journal.path()
    }
}
