// src/ledger.rs
// =============================================================================
// The checkpoint ledger: an append-only text file with one processed-file
// identifier per line.
//
// A run loads the ledger once, skips every file already listed, and appends
// a line as soon as a file is done. Each append opens, writes and closes the
// file, so a crash loses at most the file that was in flight.
//
// Rust concepts:
// - HashSet: O(1) membership checks for "already handled?"
// - OpenOptions: Open a file in append mode, creating it if needed
// =============================================================================

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reads every identifier in the log. A missing log is an empty set.
pub fn load(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read checkpoint {}", path.display()))?;

    Ok(content
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Appends `identifier` to the log, creating the file if it is absent.
///
/// No deduplication happens here; use [`Ledger::mark_done`] for that.
pub fn record(path: &Path, identifier: &str) -> Result<()> {
    if identifier.is_empty() || identifier.contains(['\n', '\r']) {
        bail!("invalid checkpoint identifier {:?}", identifier);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open checkpoint {}", path.display()))?;

    writeln!(file, "{}", identifier)
        .and_then(|_| file.flush())
        .with_context(|| format!("failed to append to checkpoint {}", path.display()))?;

    Ok(())
}

/// A loaded ledger that remembers what it has already written.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: HashSet<String>,
}

impl Ledger {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load(&path)?;
        Ok(Self { path, entries })
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains(identifier)
    }

    /// Records `identifier` unless it is already present.
    ///
    /// Returns false (and writes nothing) for a repeat.
    pub fn mark_done(&mut self, identifier: &str) -> Result<bool> {
        if self.entries.contains(identifier) {
            return Ok(false);
        }
        record(&self.path, identifier)?;
        self.entries.insert(identifier.to_string());
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_log_is_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let entries = load(&temp.path().join("checkpoint.txt")).expect("load");
        assert!(entries.is_empty());
    }

    #[test]
    fn records_accumulate_in_any_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("checkpoint.txt");

        record(&path, "a.md").expect("record a");
        record(&path, "b.md").expect("record b");
        record(&path, "a.md").expect("record a again");

        let entries = load(&path).expect("load");
        let expected: HashSet<String> = ["a.md", "b.md"].iter().map(|s| s.to_string()).collect();
        assert_eq!(entries, expected);
    }

    #[test]
    fn record_never_truncates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("checkpoint.txt");
        fs::write(&path, "old.md\n").expect("seed");

        record(&path, "new.md").expect("record");
        assert_eq!(fs::read_to_string(&path).expect("read"), "old.md\nnew.md\n");
    }

    #[test]
    fn blank_and_crlf_lines_are_ignored() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("checkpoint.txt");
        fs::write(&path, "a.md\r\nb.md\n\n\n").expect("seed");

        let entries = load(&path).expect("load");
        assert_eq!(entries.len(), 2);
        assert!(entries.contains("a.md"));
        assert!(entries.contains("b.md"));
        assert!(!entries.contains(""));
    }

    #[test]
    fn identifiers_with_line_breaks_are_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("checkpoint.txt");
        assert!(record(&path, "a\nb.md").is_err());
        assert!(record(&path, "").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn ledger_does_not_write_duplicates() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("checkpoint.txt");

        let mut ledger = Ledger::open(&path).expect("open");
        assert!(ledger.mark_done("a.md").expect("first"));
        assert!(!ledger.mark_done("a.md").expect("second"));
        assert!(ledger.contains("a.md"));
        assert_eq!(ledger.len(), 1);
        assert_eq!(fs::read_to_string(&path).expect("read"), "a.md\n");

        let reopened = Ledger::open(&path).expect("reopen");
        assert!(reopened.contains("a.md"));
    }
}
