//! Canonical source resolution.
//!
//! A [`CanonicalSource`] returns the full text of an artifact's file as it
//! existed at a trusted, pre-pinned point. It never follows a moving target
//! such as the current branch tip: the same editor that tampers with the
//! live file could also commit the tampered text.
//!
//! Every failure is a [`WardenError::Resolution`], which the validator
//! treats as fail-closed.

use crate::config::SourceConfig;
use crate::error::WardenError;
use crate::Result;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use warden_registry::ProtectedArtifact;

/// Supplies trusted canonical file text.
pub trait CanonicalSource: Send + Sync {
    /// Returns the artifact file's full trusted text.
    fn resolve(&self, artifact: &ProtectedArtifact) -> Result<String>;

    /// Short human-readable description, for logs.
    fn describe(&self) -> String;
}

/// Builds the source named by configuration.
pub fn from_config(config: &SourceConfig) -> Box<dyn CanonicalSource> {
    match config {
        SourceConfig::Git {
            repo_root,
            revision,
        } => Box::new(GitRevisionSource::new(repo_root, revision)),
        SourceConfig::Snapshot { dir } => Box::new(SnapshotSource::new(dir)),
    }
}

/// Reads artifact files from one pinned git commit via `git show`.
#[derive(Debug, Clone)]
pub struct GitRevisionSource {
    repo_root: PathBuf,
    revision: String,
}

impl GitRevisionSource {
    /// Creates a source for `revision` in the repository at `repo_root`.
    pub fn new<P: AsRef<Path>>(repo_root: P, revision: &str) -> Self {
        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
            revision: revision.to_string(),
        }
    }

    /// The pinned revision.
    pub fn revision(&self) -> &str {
        &self.revision
    }
}

/// `prompts/tier1.txt` style object path, regardless of platform separator.
fn object_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl CanonicalSource for GitRevisionSource {
    fn resolve(&self, artifact: &ProtectedArtifact) -> Result<String> {
        let object = format!("{}:{}", self.revision, object_path(&artifact.file_path));
        debug!(artifact = %artifact.name, object = %object, "Resolving canonical text from git");

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(["show", "--no-textconv", object.as_str()])
            .output()
            .map_err(|e| WardenError::resolution(&artifact.name, format!("cannot run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WardenError::resolution(
                &artifact.name,
                format!("git show {} failed: {}", object, stderr.trim()),
            ));
        }

        String::from_utf8(output.stdout).map_err(|_| {
            WardenError::resolution(&artifact.name, "canonical text is not valid UTF-8")
        })
    }

    fn describe(&self) -> String {
        format!("git {}@{}", self.repo_root.display(), self.revision)
    }
}

/// Reads artifact files from a read-only directory of trusted copies.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    dir: PathBuf,
}

impl SnapshotSource {
    /// Creates a source rooted at `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl CanonicalSource for SnapshotSource {
    fn resolve(&self, artifact: &ProtectedArtifact) -> Result<String> {
        let path = self.dir.join(&artifact.file_path);
        debug!(artifact = %artifact.name, path = %path.display(), "Resolving canonical text from snapshot");

        std::fs::read_to_string(&path).map_err(|e| {
            WardenError::resolution(&artifact.name, format!("{}: {}", path.display(), e))
        })
    }

    fn describe(&self) -> String {
        format!("snapshot {}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(path: &str) -> ProtectedArtifact {
        ProtectedArtifact {
            name: "p".to_string(),
            file_path: PathBuf::from(path),
            start_marker: "<<".to_string(),
            end_marker: ">>".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_object_path_normalizes() {
        assert_eq!(object_path(Path::new("./prompts/tier1.txt")), "prompts/tier1.txt");
        assert_eq!(object_path(Path::new("AGENTS.md")), "AGENTS.md");
    }

    #[test]
    fn test_snapshot_reads_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join("prompts/t.txt"), "<<trusted>>").unwrap();

        let source = SnapshotSource::new(dir.path());
        assert_eq!(source.resolve(&artifact("prompts/t.txt")).unwrap(), "<<trusted>>");
    }

    #[test]
    fn test_snapshot_missing_file_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SnapshotSource::new(dir.path());

        assert!(matches!(
            source.resolve(&artifact("absent.txt")),
            Err(WardenError::Resolution { .. })
        ));
    }

    #[test]
    fn test_git_unknown_revision_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = GitRevisionSource::new(dir.path(), "0000000000000000000000000000000000000000");

        assert!(matches!(
            source.resolve(&artifact("prompts/t.txt")),
            Err(WardenError::Resolution { .. })
        ));
    }

    #[test]
    fn test_from_config_describes_source() {
        let git = from_config(&SourceConfig::Git {
            repo_root: PathBuf::from("/srv/jobs"),
            revision: "abc1234".to_string(),
        });
        assert_eq!(git.describe(), "git /srv/jobs@abc1234");

        let snapshot = from_config(&SourceConfig::Snapshot {
            dir: PathBuf::from("/trusted"),
        });
        assert_eq!(snapshot.describe(), "snapshot /trusted");
    }
}
