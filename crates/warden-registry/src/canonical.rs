//! # Whitespace-Normalized Section Hashing
//!
//! Canonical form for a protected section: every run of Unicode whitespace
//! collapses to a single ASCII space and the result is trimmed. The digest
//! is SHA-256 over the UTF-8 bytes of that canonical form.
//!
//! ## Threat Model
//!
//! Normalization defends against false alarms, not attacks:
//!
//! - **Re-indentation**: tabs vs. spaces, changed indentation depth, CRLF vs.
//!   LF and trailing blank lines hash identically.
//! - **Wording changes**: any change to a non-whitespace character, or
//!   inserting/removing a word boundary, changes the digest.
//! - **Collisions**: SHA-256 makes crafting a different section with the same
//!   digest infeasible.
//!
//! ## Example
//!
//! ```rust
//! use warden_registry::canonical::{digest_section, normalize_whitespace};
//!
//! assert_eq!(normalize_whitespace("  ANALYSIS\n\tGUIDELINES:  "), "ANALYSIS GUIDELINES:");
//! assert_eq!(
//!     digest_section("ANALYSIS GUIDELINES:"),
//!     digest_section("ANALYSIS\r\n    GUIDELINES:\n"),
//! );
//! ```
//!
//! ## References
//!
//! - NIST FIPS 180-4 - "Secure Hash Standard (SHS)"

use crate::models::SectionHash;
use sha2::{Digest, Sha256};

/// Collapses whitespace runs to a single space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Computes the digest of a section's canonical form.
///
/// # Security Notes
///
/// The input should be the full section as returned by
/// [`crate::section::extract`], markers included, so that tampering with the
/// markers themselves is also detected.
pub fn digest_section(section_text: &str) -> SectionHash {
    let canonical = normalize_whitespace(section_text);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    SectionHash(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("a  b\t\tc\n\nd"), "a b c d");
        assert_eq!(normalize_whitespace("\n  leading and trailing \r\n"), "leading and trailing");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_known_digest() {
        // SHA-256("hello world")
        assert_eq!(
            digest_section("  hello \n world ").to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_indentation_is_ignored() {
        let flat = "RULES:\n- be concise\n- cite sources";
        let indented = "RULES:\n    - be concise\n\t- cite sources\n\n";
        assert_eq!(digest_section(flat), digest_section(indented));
    }

    #[test]
    fn test_wording_change_detected() {
        assert_ne!(
            digest_section("ANALYSIS GUIDELINES:"),
            digest_section("ANALYSIS GUIDELINES (UNAUTHORIZED MODIFICATION):")
        );
    }

    #[test]
    fn test_word_boundary_change_detected() {
        assert_ne!(digest_section("do not"), digest_section("donot"));
    }
}
