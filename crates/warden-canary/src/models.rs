//! # Core Types for Round-Trip Token Checking
//!
//! Data types for issued tokens, check verdicts and recorded incidents.
//!
//! ## Design Principles
//!
//! 1. **Never persisted** - [`RoundTripToken`] is deliberately not
//!    serializable and not cloneable; it lives for one outbound call.
//! 2. **Bounded evidence** - [`SecurityIncident`] carries a preview of the
//!    response, never the full body.
//! 3. **Detection only** - a verdict reports what happened; discarding,
//!    flagging or retrying the response is caller policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// A per-call secret the model is asked to echo back.
///
/// Created by [`crate::TokenIssuer::issue`], embedded into exactly one
/// rendered prompt, checked against exactly one response, then dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct RoundTripToken {
    value: String,
    issued_at: DateTime<Utc>,
    artifact_name: String,
}

impl RoundTripToken {
    pub(crate) fn new(value: String, artifact_name: &str) -> Self {
        Self {
            value,
            issued_at: Utc::now(),
            artifact_name: artifact_name.to_string(),
        }
    }

    /// The token text to embed in the prompt.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// When the token was issued.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// The artifact whose rendered prompt carries this token.
    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }
}

impl fmt::Display for RoundTripToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Kind of round-trip failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    /// The response carried a token-shaped string that is not the one issued.
    TokenMismatch,

    /// The response carried no token at all.
    TokenMissing,
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentType::TokenMismatch => f.write_str("token_mismatch"),
            IncidentType::TokenMissing => f.write_str("token_missing"),
        }
    }
}

/// An append-only record of a failed round-trip check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIncident {
    /// Unique incident identifier.
    pub incident_id: Uuid,

    /// When the failed check ran.
    pub timestamp: DateTime<Utc>,

    /// Mismatch or missing.
    pub incident_type: IncidentType,

    /// Artifact whose prompt carried the token.
    pub artifact_name: String,

    /// The token that was issued.
    pub expected_token: String,

    /// The token-shaped string found instead, if any.
    pub received_token: Option<String>,

    /// Leading characters of the response, length-bounded.
    pub response_preview: String,

    /// Length of the full response in characters.
    pub response_chars: usize,

    /// Identifier of the model that produced the response.
    pub model_identifier: String,
}

/// Result of checking a response for its round-trip token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerdict {
    /// The issued token was echoed verbatim.
    Ok,

    /// The check failed and the incident was recorded.
    ///
    /// The response must be treated as untrusted.
    Incident(SecurityIncident),
}

impl TokenVerdict {
    /// True when the response echoed the issued token.
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, TokenVerdict::Ok)
    }

    /// The recorded incident, if the check failed.
    pub fn incident(&self) -> Option<&SecurityIncident> {
        match self {
            TokenVerdict::Ok => None,
            TokenVerdict::Incident(incident) => Some(incident),
        }
    }
}

/// Errors that can occur while recording or reading incidents.
///
/// A failed round-trip check is not an error; it is a
/// [`TokenVerdict::Incident`].
#[derive(Debug, Error)]
pub enum CanaryError {
    /// The incident journal could not be written or read.
    #[error("Incident log error: {0}")]
    Journal(#[from] warden_registry::RegistryError),
}

/// Result type for canary operations.
pub type Result<T> = std::result::Result<T, CanaryError>;
