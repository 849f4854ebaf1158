//! # Warden Canary - Round-Trip Response Verification
//!
//! Detects whether a language-model response actually honored the prompt it
//! was given. Every outbound call carries a fresh token plus an instruction
//! to echo it; the response is checked for that exact token before anything
//! else uses it.
//!
//! ## Purpose
//!
//! 1. **Token Issuance** - High-entropy, never-repeating, never-persisted
//!    tokens scoped to one outbound call.
//!
//! 2. **Response Checking** - Exact-match scan with mismatch vs. missing
//!    classification.
//!
//! 3. **Incident Logging** - Append-only record of every failed check with a
//!    length-bounded response preview.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Prompt override | Injected text tells the model to ignore its prompt | Echo absent |
//! | Stale replay | A cached or replayed answer is returned | Token from another call |
//! | Token guessing | Attacker predicts the next token | 192 CSPRNG bits |
//! | Log flooding | Huge responses bloat the incident log | Bounded preview |
//!
//! ## Usage
//!
//! ```rust
//! use warden_canary::{token::embed_token, IncidentLog, ResponseChecker, TokenIssuer};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let issuer = TokenIssuer::new();
//! let checker = ResponseChecker::new(IncidentLog::open(dir.path().join("i.jsonl")).unwrap());
//!
//! let token = issuer.issue("tier1_core_prompt");
//! let prompt = embed_token("Evaluate the posting below.", &token);
//! // ... send `prompt`, receive `response` ...
//! let response = format!("ROUND-TRIP TOKEN: {}\n{{\"score\": 72}}", token.value());
//!
//! let verdict = checker.check(&token, &response, "model-a").unwrap();
//! assert!(verdict.is_ok());
//! ```
//!
//! ## Security Considerations
//!
//! - A passing check shows the prompt was seen, not that the answer is good
//! - What to do with an untrusted response (discard, flag, retry) is the
//!   caller's decision

pub mod checker;
pub mod incident;
pub mod models;
pub mod token;

pub use checker::ResponseChecker;
pub use incident::IncidentLog;
pub use models::{CanaryError, IncidentType, Result, RoundTripToken, SecurityIncident, TokenVerdict};
pub use token::TokenIssuer;
