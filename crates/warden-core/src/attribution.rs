//! Change attribution.
//!
//! There is no identity system behind an edit to a protected file. The only
//! signal used to tell an authorized edit from an unauthorized one is whether
//! an explicit "accept this content as canonical" call for the same artifact
//! is in progress. Content is never inspected to guess intent.
//!
//! | Situation | Source |
//! |-----------|--------|
//! | Mismatch inside an accept call | `User` |
//! | Mismatch anywhere else | `Agent` |
//! | Corrective write by Warden itself | `AutoRestoreProtection` |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Who caused a digest transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// An authorized human, via an explicit accept call.
    User,

    /// Any edit not covered by an explicit accept call.
    Agent,

    /// Warden's own restoring write.
    ///
    /// Never the outcome of [`attribute`] and never written to the change
    /// log, whose restore entries name the `Agent` edit they undid. It names
    /// the writer stamped into the registry's `updated_by` after a repair,
    /// and its wire form equals [`warden_registry::AUTO_RESTORE_ACTOR`].
    AutoRestoreProtection,
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeSource::User => "user",
            ChangeSource::Agent => "agent",
            ChangeSource::AutoRestoreProtection => warden_registry::AUTO_RESTORE_ACTOR,
        })
    }
}

/// What Warden did about a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    /// Nothing was written; see the entry details.
    NoAction,

    /// The live section was restored from canonical text.
    ReplacedPrompt,

    /// The registry digest was moved to the live content.
    UpdatedHash,
}

impl fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionTaken::NoAction => "no_action",
            ActionTaken::ReplacedPrompt => "replaced_prompt",
            ActionTaken::UpdatedHash => "updated_hash",
        })
    }
}

/// Attributes a detected mismatch.
pub fn attribute(preceded_by_explicit_update: bool) -> ChangeSource {
    if preceded_by_explicit_update {
        ChangeSource::User
    } else {
        ChangeSource::Agent
    }
}

/// Artifacts with an accept call in progress.
///
/// An intent is registered when an accept call starts and cleared when it
/// ends, whatever the result, so a signal never leaks into a later,
/// unrelated validation.
#[derive(Debug, Default)]
pub struct IntentLedger {
    pending: Mutex<HashMap<String, String>>,
}

impl IntentLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as being explicitly updated by `updated_by`. Returns a
    /// guard that clears the mark when dropped.
    pub fn declare<'a>(&'a self, name: &str, updated_by: &str) -> IntentGuard<'a> {
        self.lock().insert(name.to_string(), updated_by.to_string());
        IntentGuard {
            ledger: self,
            name: name.to_string(),
        }
    }

    /// Who is explicitly updating `name`, if anyone.
    pub fn declared_by(&self, name: &str) -> Option<String> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // The map holds no invariant a panicking holder could break.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears an intent on drop.
#[derive(Debug)]
pub struct IntentGuard<'a> {
    ledger: &'a IntentLedger,
    name: String,
}

impl Drop for IntentGuard<'_> {
    fn drop(&mut self) {
        self.ledger.lock().remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute() {
        assert_eq!(attribute(true), ChangeSource::User);
        assert_eq!(attribute(false), ChangeSource::Agent);
    }

    #[test]
    fn test_intent_cleared_on_drop() {
        let ledger = IntentLedger::new();
        {
            let _guard = ledger.declare("tier1_core_prompt", "alice");
            assert_eq!(ledger.declared_by("tier1_core_prompt").as_deref(), Some("alice"));
            assert_eq!(ledger.declared_by("tier2_prompt"), None);
        }
        assert_eq!(ledger.declared_by("tier1_core_prompt"), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&ChangeSource::AutoRestoreProtection).unwrap(),
            "\"auto_restore_protection\""
        );
        assert_eq!(
            serde_json::to_string(&ActionTaken::ReplacedPrompt).unwrap(),
            "\"replaced_prompt\""
        );
        assert_eq!(ActionTaken::UpdatedHash.to_string(), "updated_hash");
        assert_eq!(ChangeSource::Agent.to_string(), "agent");
    }

    #[test]
    fn test_auto_restore_matches_registry_actor() {
        assert_eq!(
            ChangeSource::AutoRestoreProtection.to_string(),
            warden_registry::AUTO_RESTORE_ACTOR
        );
        let parsed: ChangeSource =
            serde_json::from_str(&format!("\"{}\"", warden_registry::AUTO_RESTORE_ACTOR)).unwrap();
        assert_eq!(parsed, ChangeSource::AutoRestoreProtection);
    }
}
