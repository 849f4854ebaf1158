//! # Core Data Models for the Canonical Registry
//!
//! This module defines the fundamental types shared by the extractor, the
//! hasher, the registry and the journals. Each type keeps cryptographic
//! values distinct from ordinary strings so a digest can never be mixed up
//! with an artifact name or a file path.
//!
//! ## Threat Model
//!
//! The types in this module help defend against:
//!
//! - **Type Confusion**: `SectionHash` is a dedicated newtype, not a bare string.
//! - **Silent Corruption**: digests round-trip through storage as validated hex.
//! - **Unreviewed Canon**: a `CanonicalRecord` only changes through the
//!   registry's explicit `put` / `record_restoration` calls.
//!
//! ## References
//!
//! - NIST FIPS 180-4 for hash size (SHA-256 = 32 bytes)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// SHA-256 hash output size in bytes.
pub const HASH_SIZE: usize = 32;

/// Identity recorded on a record created by first-run bootstrap.
pub const BOOTSTRAP_ACTOR: &str = "bootstrap";

/// Identity recorded on a record touched by an automatic restoration.
///
/// Matches the wire name of the core crate's `AutoRestoreProtection` change
/// source.
pub const AUTO_RESTORE_ACTOR: &str = "auto_restore_protection";

/// A SHA-256 digest of a normalized protected section.
///
/// Displayed and serialized as 64 lowercase hex characters.
///
/// # Security Notes
///
/// Equality here is plain byte equality. Digests are not secrets, so
/// timing side channels are not a concern for this comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionHash(pub [u8; HASH_SIZE]);

impl SectionHash {
    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Returns the lowercase hex encoding of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the first 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for SectionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SectionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SectionHash({})", self.short())
    }
}

impl FromStr for SectionHash {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| RegistryError::InvalidDigest(e.to_string()))?;
        let array: [u8; HASH_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            RegistryError::InvalidDigest(format!("expected {} bytes, got {}", HASH_SIZE, v.len()))
        })?;
        Ok(SectionHash(array))
    }
}

impl Serialize for SectionHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SectionHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Static description of a delimiter-bounded region under protection.
///
/// Loaded from configuration and never mutated at runtime.
///
/// # Example
///
/// ```rust
/// use warden_registry::ProtectedArtifact;
///
/// let artifact = ProtectedArtifact {
///     name: "tier1_core_prompt".to_string(),
///     file_path: "prompts/tier1.txt".into(),
///     start_marker: "<!-- PROTECTED:BEGIN -->".to_string(),
///     end_marker: "<!-- PROTECTED:END -->".to_string(),
///     description: "Tier 1 analysis prompt".to_string(),
/// };
/// assert_eq!(artifact.name, "tier1_core_prompt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedArtifact {
    /// Unique artifact name, the registry key.
    pub name: String,

    /// Path of the file holding the section.
    pub file_path: PathBuf,

    /// Literal text opening the protected section.
    pub start_marker: String,

    /// Literal text closing the protected section.
    pub end_marker: String,

    /// Human-readable description stored alongside the canonical digest.
    #[serde(default)]
    pub description: String,
}

/// The authoritative digest for one artifact.
///
/// At most one record exists per artifact and records are never deleted.
/// The digest only changes through an explicit accept call; restorations
/// advance `updated_at` while leaving the digest untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Name of the protected artifact (1:1 with `ProtectedArtifact::name`).
    pub artifact_name: String,

    /// Digest explicitly accepted as authoritative.
    pub canonical_digest: SectionHash,

    /// Description copied from the artifact configuration.
    pub description: String,

    /// When the artifact was first registered.
    pub registered_at: DateTime<Utc>,

    /// When the record was last written.
    pub updated_at: DateTime<Utc>,

    /// Who last wrote the record.
    pub updated_by: String,
}

/// Errors that can occur during registry and journal operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to open, read or write the database.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize a record.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Journal file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A digest string was not 32 bytes of hex.
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// A stored key or record could not be decoded.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_hash_hex_roundtrip() {
        let hash = SectionHash([0xab; HASH_SIZE]);
        let parsed: SectionHash = hash.to_hex().parse().unwrap();
        assert_eq!(parsed, hash);
        assert_eq!(hash.short(), "abababababab");
    }

    #[test]
    fn test_section_hash_rejects_wrong_length() {
        assert!("abcd".parse::<SectionHash>().is_err());
        assert!("zz".repeat(32).parse::<SectionHash>().is_err());
    }

    #[test]
    fn test_record_serializes_digest_as_hex() {
        let now = Utc::now();
        let record = CanonicalRecord {
            artifact_name: "a".to_string(),
            canonical_digest: SectionHash([1u8; HASH_SIZE]),
            description: "d".to_string(),
            registered_at: now,
            updated_at: now,
            updated_by: BOOTSTRAP_ACTOR.to_string(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["canonical_digest"], "01".repeat(32));

        let parsed: CanonicalRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
