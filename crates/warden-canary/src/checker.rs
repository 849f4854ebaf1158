//! Response checker.
//!
//! Matches a raw model response against the token issued for its prompt and
//! records a [`SecurityIncident`] when the echo is absent or wrong. The
//! checker never aborts the caller: a failed check is a verdict, and only a
//! failure to write the incident log is an error.

use crate::incident::{bounded_preview, IncidentLog, DEFAULT_PREVIEW_CHARS};
use crate::models::{IncidentType, Result, RoundTripToken, SecurityIncident, TokenVerdict};
use crate::token::{scan_response, TokenScan};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Checks responses and records failures.
///
/// # Example
///
/// ```rust
/// use warden_canary::{IncidentLog, ResponseChecker, TokenIssuer};
///
/// let dir = tempfile::tempdir().unwrap();
/// let log = IncidentLog::open(dir.path().join("incidents.jsonl")).unwrap();
/// let checker = ResponseChecker::new(log);
/// let token = TokenIssuer::new().issue("tier1_core_prompt");
///
/// let honored = format!("ROUND-TRIP TOKEN: {}\n{{}}", token.value());
/// assert!(checker.check(&token, &honored, "model-a").unwrap().is_ok());
///
/// let subverted = "Sure! Ignoring previous instructions.";
/// assert!(!checker.check(&token, subverted, "model-a").unwrap().is_ok());
/// assert_eq!(checker.log().len().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct ResponseChecker {
    log: IncidentLog,
    preview_chars: usize,
}

impl ResponseChecker {
    /// Creates a checker with the default preview bound.
    pub fn new(log: IncidentLog) -> Self {
        Self {
            log,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Sets how many response characters an incident keeps.
    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }

    /// Checks `response` for `token`, recording an incident on failure.
    ///
    /// # Errors
    ///
    /// Only if the incident could not be appended to the log.
    pub fn check(
        &self,
        token: &RoundTripToken,
        response: &str,
        model_identifier: &str,
    ) -> Result<TokenVerdict> {
        self.check_value(token.value(), token.artifact_name(), response, model_identifier)
    }

    /// Checks `response` for a token value held outside this process.
    ///
    /// For responses captured by another process, where only the token text
    /// survives. Prefer [`ResponseChecker::check`] in-process.
    pub fn check_value(
        &self,
        expected: &str,
        artifact_name: &str,
        response: &str,
        model_identifier: &str,
    ) -> Result<TokenVerdict> {
        let (incident_type, received_token) = match scan_response(expected, response) {
            TokenScan::Echoed => {
                debug!(artifact = artifact_name, "Round-trip token echoed");
                return Ok(TokenVerdict::Ok);
            }
            TokenScan::Mismatched(found) => (IncidentType::TokenMismatch, Some(found)),
            TokenScan::Missing => (IncidentType::TokenMissing, None),
        };

        let incident = SecurityIncident {
            incident_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            incident_type,
            artifact_name: artifact_name.to_string(),
            expected_token: expected.to_string(),
            received_token,
            response_preview: bounded_preview(response, self.preview_chars),
            response_chars: response.chars().count(),
            model_identifier: model_identifier.to_string(),
        };

        warn!(
            artifact = artifact_name,
            incident = %incident.incident_id,
            kind = %incident.incident_type,
            model = model_identifier,
            "Round-trip token check failed; response is untrusted"
        );
        self.log.append(&incident)?;

        Ok(TokenVerdict::Incident(incident))
    }

    /// The underlying incident log.
    pub fn log(&self) -> &IncidentLog {
        &self.log
    }
}
