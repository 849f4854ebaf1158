//! # Section Extraction
//!
//! Locates a delimiter-bounded region inside file text. Markers are matched
//! as literal substrings, never as patterns, so marker text containing
//! regex metacharacters or escape sequences is taken at face value.
//!
//! ## Pairing Rule
//!
//! The first occurrence of the start marker is used, paired with the first
//! end marker that begins after the start marker ends. An end marker that
//! only appears before the start marker does not count.
//!
//! ```text
//!  text:  ....[START ....... END]....[START ... END]....
//!             ^start_offset      ^end_offset (exclusive)
//! ```

use std::fmt;

/// A located protected section.
///
/// `start_offset..end_offset` is a byte range into the text it was extracted
/// from and covers both markers inclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Byte offset of the first byte of the start marker.
    pub start_offset: usize,

    /// Byte offset one past the last byte of the end marker.
    pub end_offset: usize,

    /// The section text, markers included.
    pub text: String,
}

impl Section {
    /// Length of the section in bytes.
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Always false for a located section, since both markers are non-empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Why a section could not be located.
///
/// This is a skip signal for callers, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionNotFound {
    /// The start marker is absent (or empty).
    MissingStart,

    /// No end marker follows the start marker (or it is empty).
    MissingEnd,
}

impl fmt::Display for SectionNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionNotFound::MissingStart => f.write_str("start marker not found"),
            SectionNotFound::MissingEnd => f.write_str("end marker not found after start marker"),
        }
    }
}

/// Extracts the section bounded by `start_marker` and `end_marker`.
///
/// # Example
///
/// ```rust
/// use warden_registry::section::extract;
///
/// let text = "header\n<<BEGIN>>\nbody\n<<END>>\nfooter";
/// let section = extract(text, "<<BEGIN>>", "<<END>>").unwrap();
///
/// assert_eq!(section.text, "<<BEGIN>>\nbody\n<<END>>");
/// assert_eq!(&text[section.start_offset..section.end_offset], section.text);
/// ```
pub fn extract(
    text: &str,
    start_marker: &str,
    end_marker: &str,
) -> Result<Section, SectionNotFound> {
    if start_marker.is_empty() {
        return Err(SectionNotFound::MissingStart);
    }
    if end_marker.is_empty() {
        return Err(SectionNotFound::MissingEnd);
    }

    let start_offset = text.find(start_marker).ok_or(SectionNotFound::MissingStart)?;
    let search_from = start_offset + start_marker.len();

    let end_rel = text[search_from..]
        .find(end_marker)
        .ok_or(SectionNotFound::MissingEnd)?;
    let end_offset = search_from + end_rel + end_marker.len();

    Ok(Section {
        start_offset,
        end_offset,
        text: text[start_offset..end_offset].to_string(),
    })
}
