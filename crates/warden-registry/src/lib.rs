//! # Warden Registry - Canonical Section Integrity
//!
//! The Canonical Registry protects designated text regions inside prompt
//! templates and shared instruction documents. It answers one question for
//! the layers above it: "is the protected section of this file still the
//! content somebody explicitly accepted?"
//!
//! ## Purpose
//!
//! This crate implements the persistence-side building blocks:
//!
//! 1. **Section Extraction** - Literal-marker location of a delimiter-bounded
//!    region, reported as byte offsets so repairs can splice precisely.
//!
//! 2. **Canonical Hashing** - Whitespace-normalized SHA-256, so
//!    re-indentation is ignored while any wording change is detected.
//!
//! 3. **Canonical Registry** - Sled-backed map of artifact name to accepted
//!    digest, surviving restarts.
//!
//! 4. **Append-Only Journal** - JSON-lines storage for audit and incident
//!    records, exposing append and read only.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Silent edit | Agent rewrites protected wording | Digest mismatch |
//! | Marker tampering | Delimiters altered or removed | Markers are hashed; missing markers skip |
//! | Whitespace noise | Formatter re-indents a prompt | Whitespace normalization |
//! | History rewrite | Audit entries edited or deleted | Journal exposes append only |
//! | Hash collision | Crafted text with same digest | SHA-256 collision resistance |
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      WARDEN REGISTRY                       │
//! ├────────────────────────────────────────────────────────────┤
//! │                                                            │
//! │  ┌──────────────┐   text    ┌──────────────┐               │
//! │  │   SECTION    │─────────▶ │  CANONICAL   │  SectionHash  │
//! │  │  EXTRACTOR   │           │    HASHER    │──────┐        │
//! │  └──────────────┘           └──────────────┘      │        │
//! │                                                   ▼        │
//! │  ┌──────────────┐           ┌──────────────────────────┐   │
//! │  │   JOURNAL    │           │   CANONICAL REGISTRY     │   │
//! │  │  (JSONL)     │           │   (Sled storage)         │   │
//! │  └──────────────┘           └──────────────────────────┘   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use warden_registry::{CanonicalRegistry, section::extract, canonical::digest_section};
//!
//! let text = "intro\n<!-- P:BEGIN -->\nANALYSIS GUIDELINES:\n<!-- P:END -->\n";
//! let section = extract(text, "<!-- P:BEGIN -->", "<!-- P:END -->").unwrap();
//! let digest = digest_section(&section.text);
//!
//! let registry = CanonicalRegistry::temporary().unwrap();
//! match registry.get("tier1_core_prompt").unwrap() {
//!     None => {
//!         registry.put("tier1_core_prompt", digest, "Tier 1", "bootstrap").unwrap();
//!     }
//!     Some(record) if record.canonical_digest == digest => println!("valid"),
//!     Some(_) => println!("tampered"),
//! }
//! ```
//!
//! ## Security Considerations
//!
//! - The registry trusts whoever can write its database. Restrict file
//!   permissions to the warden process.
//! - Verification is point-in-time. Validate immediately before use.

pub mod canonical;
pub mod journal;
pub mod models;
pub mod registry;
pub mod section;
pub mod storage;

pub use journal::Journal;
pub use models::{
    CanonicalRecord, ProtectedArtifact, RegistryError, Result, SectionHash, AUTO_RESTORE_ACTOR,
    BOOTSTRAP_ACTOR, HASH_SIZE,
};
pub use registry::CanonicalRegistry;
pub use section::{Section, SectionNotFound};
