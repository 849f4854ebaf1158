//! Validation outcome types.

use serde::{Deserialize, Serialize};
use std::fmt;
use warden_registry::SectionHash;

/// Where a validation call ended up.
///
/// ```text
///                 ┌──────────────┐
///                 │   UNKNOWN    │ (no canonical record)
///                 └──────┬───────┘
///        ┌───────────────┼────────────────┐
///        ▼               ▼                ▼
///  BOOTSTRAPPED        VALID           TAMPERED
///                                   ┌─────┴──────┐
///                                   ▼            ▼
///                               RESTORED   RESTORE_FAILED
/// ```
///
/// `Updated` is the explicit-accept path; `NotApplicable` means the markers
/// were absent and the artifact was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityState {
    /// First sighting; live content registered as canonical.
    Bootstrapped,
    /// Live digest matches the registry.
    Valid,
    /// Tampering detected and repaired.
    Restored,
    /// Tampering detected and not repaired. Do not use the content.
    RestoreFailed,
    /// Canonical digest moved to live content by an explicit accept.
    Updated,
    /// Protected section not present.
    NotApplicable,
}

impl fmt::Display for IntegrityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntegrityState::Bootstrapped => "bootstrapped",
            IntegrityState::Valid => "valid",
            IntegrityState::Restored => "restored",
            IntegrityState::RestoreFailed => "restore_failed",
            IntegrityState::Updated => "updated",
            IntegrityState::NotApplicable => "not_applicable",
        })
    }
}

/// Result of one `validate_and_fix` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Artifact name.
    pub artifact_name: String,

    /// Whether the live content may be used.
    pub is_valid: bool,

    /// Whether the live file was rewritten by this call.
    ///
    /// Also set on a `RestoreFailed` outcome whose write landed but did not
    /// read back as canonical.
    pub was_replaced: bool,

    /// Digest of the live section as found, before any repair.
    pub computed_digest: Option<SectionHash>,

    /// Registered canonical digest after the call.
    pub canonical_digest: Option<SectionHash>,

    /// Final state.
    pub state: IntegrityState,

    /// Human-readable context for non-valid states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ValidationOutcome {
    pub(crate) fn new(artifact_name: &str, state: IntegrityState) -> Self {
        let (is_valid, was_replaced) = match state {
            IntegrityState::Bootstrapped | IntegrityState::Valid | IntegrityState::Updated => {
                (true, false)
            }
            IntegrityState::Restored => (true, true),
            IntegrityState::RestoreFailed | IntegrityState::NotApplicable => (false, false),
        };
        Self {
            artifact_name: artifact_name.to_string(),
            is_valid,
            was_replaced,
            computed_digest: None,
            canonical_digest: None,
            state,
            detail: None,
        }
    }

    pub(crate) fn with_digests(
        mut self,
        computed: Option<SectionHash>,
        canonical: Option<SectionHash>,
    ) -> Self {
        self.computed_digest = computed;
        self.canonical_digest = canonical;
        self
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Marks a failed restore whose write already reached the live file.
    pub(crate) fn with_file_rewritten(mut self) -> Self {
        self.was_replaced = true;
        self
    }

    /// The digest the live section carries after the call.
    ///
    /// For a restored artifact that is the canonical digest, not the
    /// tampered one that was found.
    pub fn digest(&self) -> Option<SectionHash> {
        match self.state {
            IntegrityState::Restored => self.canonical_digest,
            _ => self.computed_digest,
        }
    }

    /// Whether the artifact was skipped for lack of markers.
    pub fn is_not_applicable(&self) -> bool {
        self.state == IntegrityState::NotApplicable
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.artifact_name, self.state)?;
        if let Some(digest) = self.digest() {
            write!(f, " ({})", digest.short())?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " - {}", detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_registry::canonical::digest_section;

    #[test]
    fn test_state_flags() {
        assert!(ValidationOutcome::new("p", IntegrityState::Valid).is_valid);
        assert!(ValidationOutcome::new("p", IntegrityState::Bootstrapped).is_valid);

        let restored = ValidationOutcome::new("p", IntegrityState::Restored);
        assert!(restored.is_valid && restored.was_replaced);

        let failed = ValidationOutcome::new("p", IntegrityState::RestoreFailed);
        assert!(!failed.is_valid && !failed.was_replaced);

        let skipped = ValidationOutcome::new("p", IntegrityState::NotApplicable);
        assert!(!skipped.is_valid && skipped.is_not_applicable());
    }

    #[test]
    fn test_restored_digest_is_canonical() {
        let tampered = digest_section("tampered");
        let canonical = digest_section("canonical");
        let outcome = ValidationOutcome::new("p", IntegrityState::Restored)
            .with_digests(Some(tampered), Some(canonical));

        assert_eq!(outcome.digest(), Some(canonical));
    }

    #[test]
    fn test_failed_restore_can_report_rewritten_file() {
        let outcome = ValidationOutcome::new("p", IntegrityState::RestoreFailed)
            .with_file_rewritten()
            .with_detail("live file was rewritten but failed read-back verification");

        assert!(!outcome.is_valid);
        assert!(outcome.was_replaced);
        assert_eq!(outcome.state, IntegrityState::RestoreFailed);
    }

    #[test]
    fn test_display() {
        let outcome = ValidationOutcome::new("tier1_core_prompt", IntegrityState::RestoreFailed)
            .with_detail("source offline");
        assert_eq!(outcome.to_string(), "tier1_core_prompt: restore_failed - source offline");
    }
}
