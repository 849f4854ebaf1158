//! The unified Warden facade.
//!
//! [`Warden`] owns the canonical registry, the canonical source, both
//! append-only logs and the token issuer, and exposes the two contracts
//! callers rely on: "is this artifact valid, fix it if not" and "here is a
//! token and a response, do they match".

use crate::{
    attribution::{attribute, ActionTaken, ChangeSource, IntentLedger},
    audit::{ChangeLog, ChangeLogEntry},
    config::WardenConfig,
    error::WardenError,
    outcome::{IntegrityState, ValidationOutcome},
    restore,
    source::{self, CanonicalSource},
    Result,
};

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use warden_canary::{IncidentLog, ResponseChecker, RoundTripToken, SecurityIncident, TokenIssuer, TokenVerdict};
use warden_registry::{
    canonical::digest_section,
    section::{extract, Section},
    CanonicalRecord, CanonicalRegistry, ProtectedArtifact, SectionHash, BOOTSTRAP_ACTOR,
};

use tracing::{debug, error, info, warn};

/// The unified integrity facade.
///
/// # Security Model
///
/// For a validation call the pipeline is:
/// 1. Extract the protected section (absent markers: skip)
/// 2. Hash it and compare with the registry (unregistered: bootstrap)
/// 3. On mismatch, attribute the change
/// 4. Agent changes are restored from the pinned canonical source and
///    re-verified; user changes move the registry digest
///
/// The pipeline is fail-closed. If the canonical text cannot be retrieved or
/// the restored section does not hash to the canonical digest, the outcome
/// is `is_valid = false` and the live file is left as it was. If the
/// registry or the change log is unavailable the call returns an error, and
/// a change log that cannot be appended to is detected before the live file
/// or the registry is touched.
///
/// # Concurrency
///
/// All methods take `&self`. Calls for the same artifact are serialized by a
/// per-artifact lock; different artifacts proceed in parallel.
///
/// # Example
///
/// ```rust,no_run
/// use warden_core::{Warden, WardenConfig};
///
/// let warden = Warden::new(WardenConfig::load("config/warden.toml")?)?;
///
/// let outcome = warden.validate_and_fix("tier1_core_prompt")?;
/// if !outcome.is_valid {
///     // Do not render this prompt.
/// }
/// # Ok::<(), warden_core::WardenError>(())
/// ```
pub struct Warden {
    config: WardenConfig,
    registry: CanonicalRegistry,
    source: Box<dyn CanonicalSource>,
    change_log: ChangeLog,
    issuer: TokenIssuer,
    checker: ResponseChecker,
    intents: IntentLedger,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Warden {
    /// Creates a Warden with the canonical source named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid
    /// - Registry database cannot be opened
    /// - Either log cannot be created
    pub fn new(config: WardenConfig) -> Result<Self> {
        let source = source::from_config(&config.source);
        Self::with_source(config, source)
    }

    /// Creates a Warden with an explicit canonical source.
    pub fn with_source(config: WardenConfig, source: Box<dyn CanonicalSource>) -> Result<Self> {
        config.validate()?;

        let registry = CanonicalRegistry::new(&config.registry.db_path)?;
        let change_log = ChangeLog::open(&config.logs.change_log_path)?;
        let incidents = IncidentLog::open(&config.logs.incident_log_path)?;
        let checker = ResponseChecker::new(incidents).with_preview_chars(config.logs.preview_chars);

        info!(
            artifacts = config.artifacts.len(),
            source = %source.describe(),
            "Warden initialized"
        );

        Ok(Self {
            config,
            registry,
            source,
            change_log,
            issuer: TokenIssuer::new(),
            checker,
            intents: IntentLedger::new(),
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Validates an artifact and repairs it if it was tampered with.
    ///
    /// # Returns
    ///
    /// A [`ValidationOutcome`]. Callers must not use the artifact's content
    /// unless `is_valid` is true.
    ///
    /// # Errors
    ///
    /// - `UnknownArtifact` if `name` is not configured
    /// - `ArtifactUnreadable` if the live file cannot be read
    /// - `RegistryUnavailable` if the registry or change log cannot be used
    pub fn validate_and_fix(&self, name: &str) -> Result<ValidationOutcome> {
        let artifact = self.artifact(name)?;
        let lock = self.artifact_lock(name)?;
        let _held = lock
            .lock()
            .map_err(|_| WardenError::LockPoisoned(name.to_string()))?;

        self.validate_locked(artifact)
    }

    /// Validates every configured artifact, in configuration order.
    pub fn validate_all(&self) -> Result<Vec<ValidationOutcome>> {
        self.config
            .artifacts
            .iter()
            .map(|a| self.validate_and_fix(&a.name))
            .collect()
    }

    /// Accepts the artifact's current live section as its new canonical
    /// content.
    ///
    /// Only for authorized human-facing actions. The canonical source's
    /// pinned revision is not moved; if it still holds different text, a
    /// warning is logged so the revision can be re-pinned by hand.
    ///
    /// # Errors
    ///
    /// `SectionNotFound` if the live file has no protected section, plus the
    /// errors of [`Warden::validate_and_fix`].
    pub fn accept_as_canonical(&self, name: &str, updated_by: &str) -> Result<ValidationOutcome> {
        let artifact = self.artifact(name)?;
        let lock = self.artifact_lock(name)?;
        let _held = lock
            .lock()
            .map_err(|_| WardenError::LockPoisoned(name.to_string()))?;

        let text = self.read_live(artifact)?;
        if let Err(reason) = extract(&text, &artifact.start_marker, &artifact.end_marker) {
            return Err(WardenError::SectionNotFound {
                name: name.to_string(),
                reason,
            });
        }

        let outcome = {
            let _intent = self.intents.declare(name, updated_by);
            self.validate_locked(artifact)?
        };

        if outcome.state == IntegrityState::Updated {
            if let Some(accepted) = outcome.canonical_digest {
                self.warn_on_source_drift(artifact, &accepted);
            }
        }
        Ok(outcome)
    }

    /// Issues a round-trip token for one outbound call that renders `name`.
    pub fn issue_token(&self, name: &str) -> Result<RoundTripToken> {
        self.artifact(name)?;
        Ok(self.issuer.issue(name))
    }

    /// Checks a model response for its round-trip token.
    ///
    /// A failed check is recorded in the incident log and returned as
    /// [`TokenVerdict::Incident`], never as an error.
    pub fn check_response(
        &self,
        token: &RoundTripToken,
        response: &str,
        model_identifier: &str,
    ) -> Result<TokenVerdict> {
        Ok(self.checker.check(token, response, model_identifier)?)
    }

    /// Checks a response against token text issued by another process.
    pub fn check_response_value(
        &self,
        name: &str,
        expected_token: &str,
        response: &str,
        model_identifier: &str,
    ) -> Result<TokenVerdict> {
        self.artifact(name)?;
        Ok(self
            .checker
            .check_value(expected_token, name, response, model_identifier)?)
    }

    /// The canonical record for `name`, if registered.
    pub fn canonical_record(&self, name: &str) -> Result<Option<CanonicalRecord>> {
        self.artifact(name)?;
        Ok(self.registry.get(name)?)
    }

    /// Every canonical record.
    pub fn records(&self) -> Result<Vec<CanonicalRecord>> {
        Ok(self.registry.records()?)
    }

    /// Change-log entries for `name`, oldest first.
    pub fn history(&self, name: &str) -> Result<Vec<ChangeLogEntry>> {
        self.change_log.history(name)
    }

    /// Every change-log entry, oldest first.
    pub fn change_log(&self) -> Result<Vec<ChangeLogEntry>> {
        self.change_log.all()
    }

    /// Every recorded security incident, oldest first.
    pub fn incidents(&self) -> Result<Vec<SecurityIncident>> {
        Ok(self.checker.log().all()?)
    }

    /// The active configuration.
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Validation pipeline (artifact lock held)
    // -------------------------------------------------------------------------

    fn validate_locked(&self, artifact: &ProtectedArtifact) -> Result<ValidationOutcome> {
        let name = artifact.name.as_str();
        let text = self.read_live(artifact)?;

        let section = match extract(&text, &artifact.start_marker, &artifact.end_marker) {
            Ok(section) => section,
            Err(reason) => {
                debug!(artifact = name, %reason, "Protected section absent; skipping");
                return Ok(ValidationOutcome::new(name, IntegrityState::NotApplicable)
                    .with_detail(reason.to_string()));
            }
        };
        let computed = digest_section(&section.text);
        let declared_by = self.intents.declared_by(name);

        let Some(record) = self.registry.get(name)? else {
            let actor = declared_by.as_deref().unwrap_or(BOOTSTRAP_ACTOR);
            self.registry.put(name, computed, &artifact.description, actor)?;
            info!(artifact = name, digest = %computed.short(), "Bootstrapped canonical digest");
            return Ok(ValidationOutcome::new(name, IntegrityState::Bootstrapped)
                .with_digests(Some(computed), Some(computed)));
        };

        if computed == record.canonical_digest {
            debug!(artifact = name, "Protected section valid");
            return Ok(ValidationOutcome::new(name, IntegrityState::Valid)
                .with_digests(Some(computed), Some(computed)));
        }

        match attribute(declared_by.is_some()) {
            ChangeSource::User => {
                let updated_by = declared_by.unwrap_or_default();
                self.apply_update(artifact, &record, computed, &updated_by)
            }
            _ => self.restore_tampered(artifact, &text, &section, &record, computed),
        }
    }

    /// User path: the new digest becomes canonical.
    fn apply_update(
        &self,
        artifact: &ProtectedArtifact,
        record: &CanonicalRecord,
        computed: SectionHash,
        updated_by: &str,
    ) -> Result<ValidationOutcome> {
        let name = artifact.name.as_str();
        self.change_log.ensure_writable()?;
        self.registry
            .put(name, computed, &artifact.description, updated_by)?;
        self.change_log.append(&ChangeLogEntry::new(
            name,
            Some(record.canonical_digest),
            computed,
            ChangeSource::User,
            ActionTaken::UpdatedHash,
            format!("accepted as canonical by {}", updated_by),
        ))?;

        info!(
            artifact = name,
            old = %record.canonical_digest.short(),
            new = %computed.short(),
            updated_by,
            "Canonical content updated"
        );
        Ok(ValidationOutcome::new(name, IntegrityState::Updated)
            .with_digests(Some(computed), Some(computed)))
    }

    /// Agent path: restore from the canonical source, or fail closed.
    fn restore_tampered(
        &self,
        artifact: &ProtectedArtifact,
        text: &str,
        section: &Section,
        record: &CanonicalRecord,
        computed: SectionHash,
    ) -> Result<ValidationOutcome> {
        let name = artifact.name.as_str();
        let canonical = record.canonical_digest;
        warn!(
            artifact = name,
            expected = %canonical.short(),
            actual = %computed.short(),
            "Unauthorized modification of protected section"
        );

        let restored = match self.prepare_restore(artifact, text, section, &canonical) {
            Ok(restored) => restored,
            Err(e) => return self.restore_failed(artifact, canonical, computed, &e, false),
        };

        // Nothing is written unless the log can record it.
        self.change_log.ensure_writable()?;

        let path = self.config.live_path(artifact);
        if let Err(source) = restore::write_atomic(&path, &restored) {
            let e = WardenError::ArtifactUnreadable {
                name: name.to_string(),
                source,
            };
            return self.restore_failed(artifact, canonical, computed, &e, false);
        }
        let verified = read_file(name, &path)
            .and_then(|written| restore::verify_section(&written, artifact, &canonical));
        if let Err(e) = verified {
            return self.restore_failed(artifact, canonical, computed, &e, true);
        }

        self.change_log.append(&ChangeLogEntry::new(
            name,
            Some(canonical),
            computed,
            ChangeSource::Agent,
            ActionTaken::ReplacedPrompt,
            format!("restored from {}", self.source.describe()),
        ))?;
        self.registry.record_restoration(name)?;

        info!(artifact = name, digest = %canonical.short(), "Protected section restored");
        Ok(ValidationOutcome::new(name, IntegrityState::Restored)
            .with_digests(Some(computed), Some(canonical)))
    }

    /// Resolves canonical text and splices it in memory, verified against
    /// the canonical digest.
    fn prepare_restore(
        &self,
        artifact: &ProtectedArtifact,
        text: &str,
        section: &Section,
        expected: &SectionHash,
    ) -> Result<String> {
        let canonical_text = self.source.resolve(artifact)?;
        restore::restore(artifact, text, section, &canonical_text, expected)
    }

    /// Fail-closed exit of the agent path.
    ///
    /// `rewritten` is set when the live file was already replaced but did
    /// not read back as canonical.
    fn restore_failed(
        &self,
        artifact: &ProtectedArtifact,
        canonical: SectionHash,
        computed: SectionHash,
        e: &WardenError,
        rewritten: bool,
    ) -> Result<ValidationOutcome> {
        let name = artifact.name.as_str();
        let detail = if rewritten {
            format!("live file was rewritten but failed read-back verification: {}", e)
        } else {
            format!("restore failed: {}", e)
        };
        error!(artifact = name, error = %e, rewritten, "Restore failed; artifact must not be used");
        self.change_log.append(&ChangeLogEntry::new(
            name,
            Some(canonical),
            computed,
            ChangeSource::Agent,
            ActionTaken::NoAction,
            detail.clone(),
        ))?;

        let outcome = ValidationOutcome::new(name, IntegrityState::RestoreFailed)
            .with_digests(Some(computed), Some(canonical));
        Ok(if rewritten {
            outcome.with_file_rewritten().with_detail(detail)
        } else {
            outcome.with_detail(e.to_string())
        })
    }

    fn warn_on_source_drift(&self, artifact: &ProtectedArtifact, accepted: &SectionHash) {
        let pinned = self.source.resolve(artifact).and_then(|text| {
            extract(&text, &artifact.start_marker, &artifact.end_marker)
                .map(|s| digest_section(&s.text))
                .map_err(|reason| WardenError::resolution(&artifact.name, reason.to_string()))
        });

        match pinned {
            Ok(digest) if digest == *accepted => {}
            Ok(digest) => warn!(
                artifact = %artifact.name,
                pinned = %digest.short(),
                accepted = %accepted.short(),
                source = %self.source.describe(),
                "Canonical source still holds the previous content; re-pin it or restores will fail"
            ),
            Err(e) => debug!(artifact = %artifact.name, error = %e, "Could not compare with canonical source"),
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn artifact(&self, name: &str) -> Result<&ProtectedArtifact> {
        self.config
            .artifact(name)
            .ok_or_else(|| WardenError::UnknownArtifact(name.to_string()))
    }

    fn artifact_lock(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| WardenError::LockPoisoned(name.to_string()))?;
        Ok(Arc::clone(locks.entry(name.to_string()).or_default()))
    }

    fn read_live(&self, artifact: &ProtectedArtifact) -> Result<String> {
        read_file(&artifact.name, &self.config.live_path(artifact))
    }
}

fn read_file(name: &str, path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| WardenError::ArtifactUnreadable {
        name: name.to_string(),
        source,
    })
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("artifacts", &self.config.artifacts.len())
            .field("source", &self.source.describe())
            .field("registry", &self.registry)
            .finish()
    }
}
