//! Error types for Warden Core.
//!
//! Every variant is fail-closed: a caller receiving any `WardenError` from a
//! validation call must not use the artifact's content.

use thiserror::Error;
use warden_registry::SectionHash;

/// Core error type for warden operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// The artifact is not in the configuration.
    #[error("Unknown artifact: {0}")]
    UnknownArtifact(String),

    /// The live artifact file could not be read or written.
    #[error("Artifact '{name}' unreadable: {source}")]
    ArtifactUnreadable {
        /// Artifact name.
        name: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The protected section is absent from the live file.
    ///
    /// Only returned by operations that cannot skip, such as accepting new
    /// canonical content. Validation reports `NotApplicable` instead.
    #[error("Artifact '{name}': {reason}")]
    SectionNotFound {
        /// Artifact name.
        name: String,
        /// Which marker is missing.
        reason: warden_registry::SectionNotFound,
    },

    /// The durable registry could not be read or written.
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(#[from] warden_registry::RegistryError),

    /// Trusted canonical text could not be retrieved.
    #[error("Canonical source unavailable for '{name}': {detail}")]
    Resolution {
        /// Artifact name.
        name: String,
        /// What went wrong.
        detail: String,
    },

    /// A spliced result did not hash to the canonical digest.
    #[error("Restore verification failed for '{name}': expected {expected}, got {actual}")]
    RestoreVerification {
        /// Artifact name.
        name: String,
        /// Canonical digest.
        expected: SectionHash,
        /// Digest after splicing.
        actual: SectionHash,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Incident log error passthrough.
    #[error("Canary error: {0}")]
    Canary(#[from] warden_canary::CanaryError),

    /// An artifact lock was poisoned by a panicking holder.
    #[error("Lock poisoned for '{0}'")]
    LockPoisoned(String),
}

impl WardenError {
    /// Shorthand for a resolution failure.
    pub fn resolution(name: &str, detail: impl Into<String>) -> Self {
        WardenError::Resolution {
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_display() {
        let err = WardenError::resolution("tier1_core_prompt", "git exited with 128");
        assert_eq!(
            err.to_string(),
            "Canonical source unavailable for 'tier1_core_prompt': git exited with 128"
        );
    }

    #[test]
    fn test_section_not_found_display() {
        let err = WardenError::SectionNotFound {
            name: "p".to_string(),
            reason: warden_registry::SectionNotFound::MissingEnd,
        };
        assert_eq!(err.to_string(), "Artifact 'p': end marker not found after start marker");
    }
}
