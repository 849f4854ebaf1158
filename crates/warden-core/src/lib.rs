//! # Warden Core
//!
//! Integrity facade for protected prompt sections.
//! Orchestrates the canonical registry, the canonical source, precise
//! restoration, change attribution and round-trip token checking.
//!
//! ## Threat Coverage
//!
//! | Threat | Component | Defense |
//! |--------|-----------|---------|
//! | Silent prompt edit by an agent | Validator + Restorer | Hash check, offset-spliced restore |
//! | Edit committed to the current branch | Canonical Source | Pinned revision, never the tip |
//! | Escape-sequence corruption on repair | Restorer | No pattern substitution |
//! | Half-written file under concurrency | Validator | Per-artifact lock, atomic rename |
//! | Prompt override at inference time | Round-trip token | Echo check + incident log |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          WARDEN CORE                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌─────────────────┐                          │
//! │                    │     Warden      │  ← Unified Facade        │
//! │                    └────────┬────────┘                          │
//! │                             │                                   │
//! │     ┌──────────────┬────────┼─────────┬──────────────┐          │
//! │     ▼              ▼        ▼         ▼              ▼          │
//! │ ┌─────────┐  ┌──────────┐ ┌──────┐ ┌────────┐  ┌──────────┐     │
//! │ │Canonical│  │Canonical │ │Restor│ │ Change │  │  Token   │     │
//! │ │Registry │  │ Source   │ │ -er  │ │  Log   │  │ Checker  │     │
//! │ └─────────┘  └──────────┘ └──────┘ └────────┘  └──────────┘     │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warden_core::{Warden, WardenConfig};
//! use warden_canary::token::embed_token;
//!
//! let warden = Warden::new(WardenConfig::load("config/warden.toml")?)?;
//!
//! // Before rendering a protected prompt
//! let outcome = warden.validate_and_fix("tier1_core_prompt")?;
//! assert!(outcome.is_valid, "do not render: {}", outcome);
//!
//! // Around the model call
//! let token = warden.issue_token("tier1_core_prompt")?;
//! let prompt = embed_token("...rendered template...", &token);
//! let response = call_model(&prompt);
//! if !warden.check_response(&token, &response, "model-a")?.is_ok() {
//!     // Treat the response as untrusted.
//! }
//! # fn call_model(_: &str) -> String { String::new() }
//! # Ok::<(), warden_core::WardenError>(())
//! ```
//!
//! ## Security Notes
//!
//! - Fail-closed: "cannot verify" is reported as invalid, never as valid
//! - A restore is only reported once the written file re-hashes to the
//!   canonical digest
//! - Only an explicit accept call attributes a change to a user
//! - The pinned revision is moved by editing configuration, never by Warden

pub mod attribution;
pub mod audit;
pub mod config;
mod error;
pub mod outcome;
pub mod restore;
pub mod source;
mod warden;

pub use attribution::{ActionTaken, ChangeSource};
pub use audit::{ChangeLog, ChangeLogEntry};
pub use config::{LogConfig, RegistryConfig, SourceConfig, WardenConfig};
pub use error::WardenError;
pub use outcome::{IntegrityState, ValidationOutcome};
pub use source::{CanonicalSource, GitRevisionSource, SnapshotSource};
pub use warden::Warden;

// Re-export component types for convenience
pub use warden_canary::{IncidentType, RoundTripToken, SecurityIncident, TokenVerdict};
pub use warden_registry::{CanonicalRecord, ProtectedArtifact, SectionHash};

/// Core result type for warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;
