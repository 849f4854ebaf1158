//! Configuration types for Warden.

use crate::error::WardenError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use warden_canary::incident::DEFAULT_PREVIEW_CHARS;
use warden_registry::ProtectedArtifact;

/// Configuration for the Warden integrity facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Directory that artifact `file_path`s are relative to.
    pub root: PathBuf,

    /// Canonical registry configuration.
    pub registry: RegistryConfig,

    /// Audit and incident log locations.
    pub logs: LogConfig,

    /// Where trusted canonical text comes from.
    pub source: SourceConfig,

    /// Protected artifacts.
    pub artifacts: Vec<ProtectedArtifact>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            registry: RegistryConfig::default(),
            logs: LogConfig::default(),
            source: SourceConfig::default(),
            artifacts: Vec::new(),
        }
    }
}

/// Canonical registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the registry database.
    pub db_path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".warden/registry.db"),
        }
    }
}

/// Append-only log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Change log (JSON lines).
    pub change_log_path: PathBuf,

    /// Security incident log (JSON lines).
    pub incident_log_path: PathBuf,

    /// Response characters kept per incident.
    pub preview_chars: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            change_log_path: PathBuf::from(".warden/change_log.jsonl"),
            incident_log_path: PathBuf::from(".warden/security_incidents.jsonl"),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Trusted canonical source.
///
/// The revision is pinned in configuration. Moving it is a manual,
/// reviewed edit; nothing in Warden updates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A pinned commit in a git repository.
    Git {
        /// Repository root; artifact paths are resolved relative to it.
        repo_root: PathBuf,
        /// Full commit id (40 or 64 hex characters).
        revision: String,
    },

    /// A read-only directory holding trusted copies at the same relative paths.
    Snapshot {
        /// Snapshot root directory.
        dir: PathBuf,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Snapshot {
            dir: PathBuf::from(".warden/canonical"),
        }
    }
}

impl WardenConfig {
    /// Loads a configuration from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WardenError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: WardenConfig =
            toml::from_str(raw).map_err(|e| WardenError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Looks up an artifact by name.
    pub fn artifact(&self, name: &str) -> Option<&ProtectedArtifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    /// Location of an artifact's live file.
    pub fn live_path(&self, artifact: &ProtectedArtifact) -> PathBuf {
        self.root.join(&artifact.file_path)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// `WardenError::Config` on duplicate names, empty or identical markers,
    /// a zero preview length, or a git revision that is not a commit id.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for artifact in &self.artifacts {
            if artifact.name.trim().is_empty() {
                return Err(WardenError::Config("artifact with empty name".to_string()));
            }
            if !names.insert(artifact.name.as_str()) {
                return Err(WardenError::Config(format!(
                    "duplicate artifact name '{}'",
                    artifact.name
                )));
            }
            if !is_plain_relative(&artifact.file_path) {
                return Err(WardenError::Config(format!(
                    "artifact '{}' path must be relative to root without '..'",
                    artifact.name
                )));
            }
            if artifact.start_marker.is_empty() || artifact.end_marker.is_empty() {
                return Err(WardenError::Config(format!(
                    "artifact '{}' has an empty marker",
                    artifact.name
                )));
            }
            if artifact.start_marker == artifact.end_marker {
                return Err(WardenError::Config(format!(
                    "artifact '{}' uses the same text for both markers",
                    artifact.name
                )));
            }
        }

        if self.logs.preview_chars == 0 {
            return Err(WardenError::Config("logs.preview_chars must be > 0".to_string()));
        }

        if let SourceConfig::Git { revision, .. } = &self.source {
            if !is_commit_id(revision) {
                return Err(WardenError::Config(format!(
                    "source.revision '{}' is not a pinned commit id",
                    revision
                )));
            }
        }

        Ok(())
    }
}

/// Relative, and never climbs out of its base directory.
fn is_plain_relative(path: &Path) -> bool {
    path.is_relative()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// A full SHA-1 (40) or SHA-256 (64) object id.
///
/// Abbreviated ids are refused: git resolves a ref with the same name first,
/// so a branch named like the pin would turn it into a moving target.
fn is_commit_id(revision: &str) -> bool {
    matches!(revision.len(), 40 | 64) && revision.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r###"
[registry]
db_path = "/var/lib/warden/registry.db"

[logs]
preview_chars = 200

[source]
kind = "git"
repo_root = "/srv/jobs"
revision = "4f2c9e1d8b7a6f5e4d3c2b1a0f9e8d7c6b5a4f3e"

[[artifacts]]
name = "tier1_core_prompt"
file_path = "prompts/tier1.txt"
start_marker = "<!-- PROTECTED:BEGIN -->"
end_marker = "<!-- PROTECTED:END -->"
description = "Tier 1 analysis prompt"

[[artifacts]]
name = "agent_instructions"
file_path = "AGENTS.md"
start_marker = "## PROTECTED"
end_marker = "## END PROTECTED"
"###;

    #[test]
    fn test_default_config() {
        let config = WardenConfig::default();
        assert_eq!(config.logs.preview_chars, DEFAULT_PREVIEW_CHARS);
        assert!(config.artifacts.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = WardenConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.artifacts.len(), 2);
        assert_eq!(config.logs.preview_chars, 200);
        assert_eq!(
            config.logs.change_log_path,
            PathBuf::from(".warden/change_log.jsonl")
        );
        assert!(matches!(config.source, SourceConfig::Git { .. }));
        assert_eq!(config.artifact("agent_instructions").unwrap().description, "");
    }

    #[test]
    fn test_symbolic_revision_rejected() {
        for revision in ["HEAD", "main", "origin/main", "abc", "4f2c9e1", "4f2c9e1d8b7a6f5e"] {
            let raw = SAMPLE.replace("4f2c9e1d8b7a6f5e4d3c2b1a0f9e8d7c6b5a4f3e", revision);
            assert!(
                matches!(WardenConfig::from_toml(&raw), Err(WardenError::Config(_))),
                "revision {} should be rejected",
                revision
            );
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let raw = SAMPLE.replace("agent_instructions", "tier1_core_prompt");
        assert!(matches!(WardenConfig::from_toml(&raw), Err(WardenError::Config(_))));
    }

    #[test]
    fn test_identical_markers_rejected() {
        let raw = SAMPLE.replace("## END PROTECTED", "## PROTECTED");
        assert!(matches!(WardenConfig::from_toml(&raw), Err(WardenError::Config(_))));
    }

    #[test]
    fn test_escaping_paths_rejected() {
        for bad in ["/etc/prompt.txt", "../outside.txt", "prompts/../../x.txt"] {
            let raw = SAMPLE.replace("prompts/tier1.txt", bad);
            assert!(
                matches!(WardenConfig::from_toml(&raw), Err(WardenError::Config(_))),
                "path {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_live_path_joins_root() {
        let mut config = WardenConfig::from_toml(SAMPLE).unwrap();
        config.root = PathBuf::from("/srv/jobs");
        let artifact = config.artifact("tier1_core_prompt").unwrap();
        assert_eq!(config.live_path(artifact), PathBuf::from("/srv/jobs/prompts/tier1.txt"));
    }

    #[test]
    fn test_config_serialization() {
        let config = WardenConfig::from_toml(SAMPLE).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: WardenConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.artifacts, config.artifacts);
        assert_eq!(parsed.source, config.source);
    }
}
