//! Precise restoration of a protected section.
//!
//! Restoration is offset splicing only:
//!
//! ```text
//!  live:      [ prefix ][ START ... tampered ... END ][ suffix ]
//!                       ^start_offset                 ^end_offset
//!  restored:  [ prefix ][ START ... canonical ... END ][ suffix ]
//! ```
//!
//! The canonical bytes are copied verbatim. No search-and-replace is run
//! over the file afterwards, so backslashes, `$1`-style group references and
//! other text that a substitution engine would reinterpret survive intact.
//!
//! ## Verification
//!
//! A splice is only accepted if re-extracting the section from the result
//! and hashing it yields the canonical digest. The written file is read back
//! and checked again. Either mismatch is a [`WardenError::RestoreVerification`].

use crate::error::WardenError;
use crate::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use warden_registry::canonical::digest_section;
use warden_registry::section::{extract, Section};
use warden_registry::{ProtectedArtifact, SectionHash};

/// Replaces `section` inside `current_text` with `canonical_section_text`.
///
/// Everything outside `section.start_offset..section.end_offset` is kept
/// byte-for-byte.
pub fn splice(current_text: &str, section: &Section, canonical_section_text: &str) -> String {
    let mut out = String::with_capacity(
        current_text.len() - section.len() + canonical_section_text.len(),
    );
    out.push_str(&current_text[..section.start_offset]);
    out.push_str(canonical_section_text);
    out.push_str(&current_text[section.end_offset..]);
    out
}

/// Checks that `text` carries a section of `artifact` hashing to `expected`.
pub fn verify_section(text: &str, artifact: &ProtectedArtifact, expected: &SectionHash) -> Result<()> {
    let actual = extract(text, &artifact.start_marker, &artifact.end_marker)
        .map(|s| digest_section(&s.text))
        .map_err(|reason| WardenError::SectionNotFound {
            name: artifact.name.clone(),
            reason,
        })?;

    if actual != *expected {
        return Err(WardenError::RestoreVerification {
            name: artifact.name.clone(),
            expected: *expected,
            actual,
        });
    }
    Ok(())
}

/// Builds the restored file text for `artifact`.
///
/// # Arguments
///
/// * `current_text` - Full live file text
/// * `current_section` - Section extracted from `current_text`
/// * `canonical_file_text` - Full trusted file text from the canonical source
/// * `expected` - Registered canonical digest
///
/// # Errors
///
/// - `Resolution` if the trusted text has no protected section, or its
///   section does not hash to `expected`
/// - `RestoreVerification` if the spliced text fails the post-check
pub fn restore(
    artifact: &ProtectedArtifact,
    current_text: &str,
    current_section: &Section,
    canonical_file_text: &str,
    expected: &SectionHash,
) -> Result<String> {
    let canonical = extract(canonical_file_text, &artifact.start_marker, &artifact.end_marker)
        .map_err(|reason| {
            WardenError::resolution(&artifact.name, format!("canonical text: {}", reason))
        })?;

    let canonical_digest = digest_section(&canonical.text);
    if canonical_digest != *expected {
        return Err(WardenError::resolution(
            &artifact.name,
            format!(
                "canonical source digest {} does not match registered digest {}",
                canonical_digest.short(),
                expected.short()
            ),
        ));
    }

    let restored = splice(current_text, current_section, &canonical.text);
    verify_section(&restored, artifact, expected)?;

    debug!(
        artifact = %artifact.name,
        removed = current_section.len(),
        inserted = canonical.len(),
        "Section spliced"
    );
    Ok(restored)
}

/// Sibling temp path, so the final rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.warden-tmp", name))
}

/// Replaces the file at `path` with `text` in one rename.
///
/// Readers see either the old or the new content, never a partial write.
pub fn write_atomic(path: &Path, text: &str) -> std::io::Result<()> {
    let tmp_path = temp_path(path);
    let written = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        if let Ok(meta) = fs::metadata(path) {
            fs::set_permissions(&tmp_path, meta.permissions())?;
        }
        fs::rename(&tmp_path, path)
    })();

    if written.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    written
}
