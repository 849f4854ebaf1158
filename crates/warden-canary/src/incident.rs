//! Append-only security incident log.
//!
//! Incidents are written once and never updated. Response bodies are cut to
//! a fixed number of characters before they reach the log.

use crate::models::{Result, SecurityIncident};
use std::path::Path;
use warden_registry::Journal;

/// Default number of response characters kept in an incident preview.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Returns at most `limit` leading characters of `text`.
///
/// Cuts on a `char` boundary, so multi-byte text never splits mid-character.
pub fn bounded_preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

/// Durable store of [`SecurityIncident`] records.
#[derive(Debug)]
pub struct IncidentLog {
    journal: Journal<SecurityIncident>,
}

impl IncidentLog {
    /// Opens (or creates) the incident log at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            journal: Journal::open(path)?,
        })
    }

    /// Appends one incident.
    pub fn append(&self, incident: &SecurityIncident) -> Result<()> {
        self.journal.append(incident)?;
        Ok(())
    }

    /// Every incident in the order recorded.
    pub fn all(&self) -> Result<Vec<SecurityIncident>> {
        Ok(self.journal.read_all()?)
    }

    /// Incidents raised for one artifact.
    pub fn for_artifact(&self, artifact_name: &str) -> Result<Vec<SecurityIncident>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|incident| incident.artifact_name == artifact_name)
            .collect())
    }

    /// Number of recorded incidents.
    pub fn len(&self) -> Result<usize> {
        Ok(self.journal.len()?)
    }

    /// Returns true if no incident has been recorded.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.journal.is_empty()?)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.journal.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IncidentType;
    use chrono::Utc;
    use uuid::Uuid;

    fn incident(artifact: &str) -> SecurityIncident {
        SecurityIncident {
            incident_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            incident_type: IncidentType::TokenMissing,
            artifact_name: artifact.to_string(),
            expected_token: "RTT-00".to_string(),
            received_token: None,
            response_preview: "preview".to_string(),
            response_chars: 7,
            model_identifier: "model-x".to_string(),
        }
    }

    #[test]
    fn test_bounded_preview_ascii() {
        assert_eq!(bounded_preview("abcdef", 3), "abc");
        assert_eq!(bounded_preview("abc", 10), "abc");
        assert_eq!(bounded_preview("abc", 0), "");
    }

    #[test]
    fn test_bounded_preview_multibyte() {
        assert_eq!(bounded_preview("ééé€€", 4), "ééé€");
    }

    #[test]
    fn test_append_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let log = IncidentLog::open(dir.path().join("incidents.jsonl")).unwrap();

        log.append(&incident("a")).unwrap();
        log.append(&incident("b")).unwrap();
        log.append(&incident("a")).unwrap();

        assert_eq!(log.len().unwrap(), 3);
        assert_eq!(log.for_artifact("a").unwrap().len(), 2);
        assert!(log.for_artifact("c").unwrap().is_empty());
    }
}
