//! # Round-Trip Tokens for Response Subversion Detection
//!
//! A fresh token is embedded in every outbound prompt together with an
//! instruction to echo it back. A response that honored the prompt carries
//! the token; a response produced after the prompt was overridden (injected
//! instructions, a swapped system prompt, a replayed answer) usually does not.
//!
//! ## How Round-Trip Tokens Work
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     ROUND-TRIP TOKEN FLOW                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  1. ISSUE          issue("tier1_core_prompt") ──▶ RTT-3f9c…      │
//! │                                                                  │
//! │  2. EMBED          [ROUND-TRIP TOKEN: RTT-3f9c…]                 │
//! │                    <rendered prompt>                             │
//! │                    [ROUND-TRIP TOKEN: RTT-3f9c…]                 │
//! │                                                                  │
//! │  3. CHECK          response contains RTT-3f9c… ?                 │
//! │                      yes ─▶ Ok                                   │
//! │                      other RTT-… ─▶ TokenMismatch incident        │
//! │                      none ─▶ TokenMissing incident               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Uniqueness**: a process-wide counter is mixed into every token, so two
//!    tokens from one issuer are never equal
//! 2. **Unforgeable**: 192 bits from the OS CSPRNG per token
//! 3. **Detectable Format**: the `RTT-` prefix makes near-miss echoes visible
//! 4. **Single-Use**: tokens are never persisted or reissued
//!
//! ## References
//!
//! - **Rebuff Framework**: <https://github.com/protectai/rebuff>
//! - **OWASP LLM01**: Prompt Injection

use crate::models::RoundTripToken;
use rand::RngCore;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Prefix for round-trip tokens.
pub const TOKEN_PREFIX: &str = "RTT-";

/// Random bytes drawn per token.
const RANDOM_BYTES: usize = 24;

/// Label used around the token in rendered prompts.
const DIRECTIVE_LABEL: &str = "ROUND-TRIP TOKEN";

/// Anything that looks like a round-trip token, including mangled echoes.
fn token_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"(?i)\brtt-[0-9a-z]+").expect("token shape regex is valid"))
}

/// Issues single-use round-trip tokens.
///
/// # Example
///
/// ```rust
/// use warden_canary::TokenIssuer;
///
/// let issuer = TokenIssuer::new();
/// let t1 = issuer.issue("tier1_core_prompt");
/// let t2 = issuer.issue("tier1_core_prompt");
///
/// assert_ne!(t1.value(), t2.value());
/// assert!(t1.value().starts_with("RTT-"));
/// ```
#[derive(Debug, Default)]
pub struct TokenIssuer {
    sequence: AtomicU64,
}

impl TokenIssuer {
    /// Creates an issuer with its sequence at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for one outbound call.
    ///
    /// The value is `RTT-` followed by 64 lowercase hex characters: a 64-bit
    /// sequence number and 192 random bits.
    pub fn issue(&self, artifact_name: &str) -> RoundTripToken {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);

        let mut random = [0u8; RANDOM_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut random);

        let value = format!("{}{:016x}{}", TOKEN_PREFIX, seq, hex::encode(random));
        RoundTripToken::new(value, artifact_name)
    }

    /// Number of tokens issued so far.
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

/// Renders the instruction asking the model to echo the token.
pub fn render_echo_directive(token: &RoundTripToken) -> String {
    format!(
        "[{label}: {value}]\nBegin your response with the line \"{label}: {value}\" exactly as written.",
        label = DIRECTIVE_LABEL,
        value = token.value()
    )
}

/// Places the echo directive before and after a rendered prompt.
///
/// # Example
///
/// ```rust
/// use warden_canary::{token::embed_token, TokenIssuer};
///
/// let token = TokenIssuer::new().issue("tier1_core_prompt");
/// let prompt = embed_token("Score this candidate.", &token);
///
/// assert_eq!(prompt.matches(token.value()).count(), 4);
/// assert!(prompt.contains("Score this candidate."));
/// ```
pub fn embed_token(prompt: &str, token: &RoundTripToken) -> String {
    let directive = render_echo_directive(token);
    format!("{directive}\n\n{prompt}\n\n{directive}")
}

/// What a response carried in place of the expected token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenScan {
    /// The expected token appears verbatim.
    Echoed,

    /// A token-shaped string appears, but not the expected one.
    Mismatched(String),

    /// No token-shaped string appears.
    Missing,
}

/// Scans a response for the expected token.
///
/// Exact substring match on the expected value; case changes or truncation
/// count as a mismatch.
pub fn scan_response(expected: &str, response: &str) -> TokenScan {
    if !expected.is_empty() && response.contains(expected) {
        return TokenScan::Echoed;
    }

    match token_shape().find(response) {
        Some(found) => TokenScan::Mismatched(found.as_str().to_string()),
        None => TokenScan::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_token_format() {
        let token = TokenIssuer::new().issue("p");
        let hex_part = &token.value()[TOKEN_PREFIX.len()..];

        assert!(token.value().starts_with(TOKEN_PREFIX));
        assert_eq!(hex_part.len(), 64);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_tokens_unique_across_threads() {
        let issuer = Arc::new(TokenIssuer::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let issuer = Arc::clone(&issuer);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| issuer.issue("p").value().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate token issued");
            }
        }
        assert_eq!(issuer.issued(), 1000);
    }

    #[test]
    fn test_embed_places_directive_twice() {
        let token = TokenIssuer::new().issue("p");
        let embedded = embed_token("PROMPT BODY", &token);

        assert!(embedded.starts_with("[ROUND-TRIP TOKEN: "));
        assert!(embedded.trim_end().ends_with("exactly as written."));
        assert_eq!(embedded.matches("PROMPT BODY").count(), 1);
    }

    #[test]
    fn test_scan_echoed() {
        let token = TokenIssuer::new().issue("p");
        let response = format!("ROUND-TRIP TOKEN: {}\n{{\"score\": 80}}", token.value());
        assert_eq!(scan_response(token.value(), &response), TokenScan::Echoed);
    }

    #[test]
    fn test_scan_missing() {
        let token = TokenIssuer::new().issue("p");
        assert_eq!(scan_response(token.value(), "{\"score\": 80}"), TokenScan::Missing);
    }

    #[test]
    fn test_scan_mismatched() {
        let issuer = TokenIssuer::new();
        let expected = issuer.issue("p");
        let other = issuer.issue("p");
        let response = format!("ROUND-TRIP TOKEN: {}", other.value());

        assert_eq!(
            scan_response(expected.value(), &response),
            TokenScan::Mismatched(other.value().to_string())
        );
    }

    #[test]
    fn test_scan_truncated_echo_is_mismatch() {
        let token = TokenIssuer::new().issue("p");
        let truncated = &token.value()[..20];
        assert_eq!(
            scan_response(token.value(), truncated),
            TokenScan::Mismatched(truncated.to_string())
        );
    }

    #[test]
    fn test_scan_uppercased_echo_is_mismatch() {
        let token = TokenIssuer::new().issue("p");
        let shouted = token.value().to_uppercase();
        assert!(matches!(
            scan_response(token.value(), &shouted),
            TokenScan::Mismatched(_)
        ));
    }
}
