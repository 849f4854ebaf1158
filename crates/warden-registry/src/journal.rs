//! # Append-Only Journal
//!
//! Durable sequential storage with exactly two operations: append a record,
//! read every record back in order. There is no update, truncate or delete.
//! Retention and rotation are left to external policy.
//!
//! ## File Format
//!
//! JSON Lines: one serialized record per line, newline terminated. Each
//! append opens the file in append mode, takes an exclusive advisory lock,
//! writes the full line in one call and syncs before releasing the lock, so
//! concurrent writers (threads or processes) never interleave records.

use crate::models::{RegistryError, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// An append-only JSON-lines file of `T` records.
///
/// # Example
///
/// ```rust
/// use warden_registry::Journal;
///
/// let dir = tempfile::tempdir().unwrap();
/// let journal: Journal<String> = Journal::open(dir.path().join("log.jsonl")).unwrap();
///
/// journal.append(&"first".to_string()).unwrap();
/// journal.append(&"second".to_string()).unwrap();
///
/// assert_eq!(journal.read_all().unwrap(), vec!["first", "second"]);
/// ```
pub struct Journal<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> Journal<T> {
    /// Opens a journal, creating the file and its parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Journal {
            path,
            _record: PhantomData,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks that a record could be appended right now.
    ///
    /// Recreates the file if it was rotated away.
    pub fn ensure_writable(&self) -> Result<()> {
        OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }

    /// Appends one record and syncs it to disk.
    ///
    /// A file moved away by external rotation is recreated.
    pub fn append(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        FileExt::lock_exclusive(&file)?;
        let written = file.write_all(&line).and_then(|_| file.sync_data());
        let unlocked = FileExt::unlock(&file);
        written?;
        unlocked?;

        Ok(())
    }

    /// Reads every record in append order.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::CorruptRecord` naming the line number if any
    /// line fails to parse. Blank lines are skipped. A missing file (rotated
    /// away) reads as empty.
    pub fn read_all(&self) -> Result<Vec<T>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        FileExt::lock_shared(&file)?;

        let mut records = Vec::new();
        let mut outcome = Ok(());
        for (index, line) in BufReader::new(&file).lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    outcome = Err(RegistryError::Io(e));
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    outcome = Err(RegistryError::CorruptRecord(format!(
                        "{} line {}: {}",
                        self.path.display(),
                        index + 1,
                        e
                    )));
                    break;
                }
            }
        }

        FileExt::unlock(&file)?;
        outcome.map(|_| records)
    }

    /// Number of records in the journal.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    /// Returns true if the journal holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<T> std::fmt::Debug for Journal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        seq: u32,
        note: String,
    }

    #[test]
    fn test_append_and_read_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let journal: Journal<Entry> = Journal::open(dir.path().join("j.jsonl")).unwrap();

        for seq in 0..5 {
            journal
                .append(&Entry {
                    seq,
                    note: format!("entry {}", seq),
                })
                .unwrap();
        }

        let seqs: Vec<u32> = journal.read_all().unwrap().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/j.jsonl");
        let journal: Journal<Entry> = Journal::open(&path).unwrap();

        assert!(path.exists());
        assert!(journal.is_empty().unwrap());
    }

    #[test]
    fn test_reopen_keeps_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");

        let first: Journal<Entry> = Journal::open(&path).unwrap();
        first
            .append(&Entry {
                seq: 1,
                note: "kept".to_string(),
            })
            .unwrap();

        let second: Journal<Entry> = Journal::open(&path).unwrap();
        assert_eq!(second.len().unwrap(), 1);
    }

    #[test]
    fn test_one_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        let journal: Journal<Entry> = Journal::open(&path).unwrap();

        journal
            .append(&Entry {
                seq: 1,
                note: "multi\nline\nnote".to_string(),
            })
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 1);
        assert_eq!(journal.read_all().unwrap()[0].note, "multi\nline\nnote");
    }

    #[test]
    fn test_corrupt_line_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        fs::write(&path, "{\"seq\":1,\"note\":\"ok\"}\nnot json\n").unwrap();

        let journal: Journal<Entry> = Journal::open(&path).unwrap();
        match journal.read_all() {
            Err(RegistryError::CorruptRecord(msg)) => assert!(msg.contains("line 2")),
            other => panic!("Expected CorruptRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_rotated_file_reads_empty_and_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        let journal: Journal<Entry> = Journal::open(&path).unwrap();
        journal
            .append(&Entry {
                seq: 1,
                note: "before rotation".to_string(),
            })
            .unwrap();

        fs::rename(&path, dir.path().join("j.jsonl.1")).unwrap();
        assert!(journal.read_all().unwrap().is_empty());

        journal
            .append(&Entry {
                seq: 2,
                note: "after rotation".to_string(),
            })
            .unwrap();
        let seqs: Vec<u32> = journal.read_all().unwrap().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![2]);
    }

    #[test]
    fn test_ensure_writable_fails_when_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("j.jsonl");
        let journal: Journal<Entry> = Journal::open(&path).unwrap();

        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(journal.ensure_writable().is_err());
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let journal: Arc<Journal<Entry>> =
            Arc::new(Journal::open(dir.path().join("j.jsonl")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let journal = Arc::clone(&journal);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        journal
                            .append(&Entry {
                                seq: t * 100 + i,
                                note: "x".repeat(256),
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(journal.read_all().unwrap().len(), 80);
    }
}
