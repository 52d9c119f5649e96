// src/mutate.rs
// =============================================================================
// This module rewrites Markdown files.
//
// Two text transforms:
// - remove_dead_links(): links pointing at a failing URL (and links whose
//   target is already empty) collapse to their plain text
// - repair_empty_links(): "[text]()" collapses to "text"
//
// Both work on parsed link nodes (see checker::markdown), so a failing URL
// mentioned in prose or shown inside a code block stays as written.
//
// Writing back goes through a temporary file in the same directory that is
// renamed over the original, so a crash mid-write leaves either the old file
// or the new one, never half of each.
//
// Failures are written to an error log ("<file>: <error>") that is created
// the first time something goes wrong.
// =============================================================================

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::checker::{drop_definitions_where, link_destination, unlink_where, LinkNode};

/// The result of a text transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// Number of link constructs collapsed
    pub unlinked: usize,
    /// Number of `[label]: url` definitions removed
    pub definitions_dropped: usize,
}

impl Rewrite {
    pub fn changed(&self) -> bool {
        self.unlinked > 0 || self.definitions_dropped > 0
    }
}

/// Collapses links whose target is one of `dead_urls` or is empty, then
/// drops reference definitions of dead URLs that nothing uses any more.
///
/// `dead_urls` hold URLs as written in the file. A link target is compared
/// both as written and as it resolves (`set\_up` resolves to `set_up`).
pub fn remove_dead_links(markdown: &str, dead_urls: &HashSet<&str>) -> Rewrite {
    let dead: HashSet<String> = dead_urls
        .iter()
        .flat_map(|url| [url.to_string(), link_destination(url)])
        .collect();

    let (text, unlinked) = unlink_where(markdown, |link: &LinkNode| {
        link.has_empty_target() || dead.contains(link.target.trim())
    });
    let (text, definitions_dropped) = drop_definitions_where(&text, |dest| dead.contains(dest.trim()));

    Rewrite {
        text,
        unlinked,
        definitions_dropped,
    }
}

/// Collapses links with an empty target, leaving everything else alone.
pub fn repair_empty_links(markdown: &str) -> Rewrite {
    let (text, unlinked) = unlink_where(markdown, LinkNode::has_empty_target);
    Rewrite {
        text,
        unlinked,
        definitions_dropped: 0,
    }
}

/// Replaces the contents of `path` with `bytes` via temp file + rename.
///
/// The original file's permissions are carried over.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(directory)
        .with_context(|| format!("failed to create temp file in {}", directory.display()))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .with_context(|| format!("failed to copy permissions of {}", path.display()))?;
    }

    temp.persist(path)
        .map_err(|error| error.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Appends "<file>: <error>" lines to a log file created on first use.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    written: usize,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    pub fn log(&mut self, file: &Path, error: &anyhow::Error) -> Result<()> {
        self.log_message(file, &format!("{:#}", error))
    }

    pub fn log_message(&mut self, file: &Path, message: &str) -> Result<()> {
        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open error log {}", self.path.display()))?;
        writeln!(log, "{}: {}", file.display(), message)
            .with_context(|| format!("failed to write error log {}", self.path.display()))?;
        self.written += 1;
        Ok(())
    }

    /// Logs, and if even the log cannot be written, reports that on stderr.
    pub fn record(&mut self, file: &Path, error: &anyhow::Error) {
        tracing::warn!(file = %file.display(), "{:#}", error);
        if let Err(log_error) = self.log(file, error) {
            tracing::error!("{:#}", log_error);
        }
    }

    /// Number of lines written during this run.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn dead<'a>(urls: &[&'a str]) -> HashSet<&'a str> {
        urls.iter().copied().collect()
    }

    #[test]
    fn dead_link_collapses_to_its_text() {
        let rewrite = remove_dead_links(
            "See [here](https://dead.example/a) for more.",
            &dead(&["https://dead.example/a"]),
        );
        assert_eq!(rewrite.text, "See here for more.");
        assert_eq!(rewrite.unlinked, 1);
    }

    #[test]
    fn plain_mentions_and_code_survive_removal() {
        let markdown = "Old site: https://dead.example/a\n\n`[x](https://dead.example/a)`\n\n[gone](https://dead.example/a) and [fine](https://ok.example)\n";
        let rewrite = remove_dead_links(markdown, &dead(&["https://dead.example/a"]));
        assert_eq!(
            rewrite.text,
            "Old site: https://dead.example/a\n\n`[x](https://dead.example/a)`\n\ngone and [fine](https://ok.example)\n"
        );
    }

    #[test]
    fn removal_also_repairs_existing_empty_links() {
        let rewrite = remove_dead_links("[a]() [b](https://dead.example)", &dead(&["https://dead.example"]));
        assert_eq!(rewrite.text, "a b");
        assert_eq!(rewrite.unlinked, 2);
    }

    #[test]
    fn escaped_targets_match_the_url_as_written() {
        let rewrite = remove_dead_links(
            r"Read [the guide](https://dead.example/docs/set\_up) today.",
            &dead(&[r"https://dead.example/docs/set\_up"]),
        );
        assert_eq!(rewrite.text, "Read the guide today.");
        assert_eq!(rewrite.unlinked, 1);
    }

    #[test]
    fn dead_reference_definitions_go_with_their_links() {
        let markdown = "See [docs][d] and [home][h].\n\n[d]: https://dead.example/docs\n[h]: https://ok.example\n";
        let rewrite = remove_dead_links(markdown, &dead(&["https://dead.example/docs"]));
        assert_eq!(rewrite.text, "See docs and [home][h].\n\n[h]: https://ok.example\n");
        assert_eq!(rewrite.unlinked, 1);
        assert_eq!(rewrite.definitions_dropped, 1);
        assert!(rewrite.changed());
    }

    #[test]
    fn dead_autolinks_are_dropped() {
        let rewrite = remove_dead_links("Visit <https://dead.example/x> now", &dead(&["https://dead.example/x"]));
        assert_eq!(rewrite.text, "Visit  now");
    }

    #[test]
    fn nothing_dead_means_unchanged() {
        let markdown = "[a](https://a.example)";
        let rewrite = remove_dead_links(markdown, &HashSet::new());
        assert_eq!(rewrite.text, markdown);
        assert!(!rewrite.changed());
    }

    #[test]
    fn repair_handles_whitespace_targets() {
        let rewrite = repair_empty_links("Read [this]() and [that](   ) or [keep](https://a.example).");
        assert_eq!(rewrite.text, "Read this and that or [keep](https://a.example).");
        assert_eq!(rewrite.unlinked, 2);
    }

    #[test]
    fn repair_is_idempotent() {
        let markdown = "x [a]() y [b](https://b.example) z [c]( )";
        let once = repair_empty_links(markdown);
        let twice = repair_empty_links(&once.text);
        assert_eq!(once.text, twice.text);
        assert!(!twice.changed());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("post.md");
        fs::write(&path, "old content that is longer").expect("seed");

        write_atomic(&path, b"new").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");

        let leftovers: Vec<_> = fs::read_dir(temp.path()).expect("list").collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("post.md");
        fs::write(&path, "old").expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        write_atomic(&path, b"new").expect("write");
        let mode = fs::metadata(&path).expect("stat").permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn error_log_is_created_lazily() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("errors.txt");
        let mut log = ErrorLog::new(&path);
        assert!(!path.exists());

        log.log(Path::new("blog/a.md"), &anyhow!("stream did not contain valid UTF-8"))
            .expect("log");
        log.log_message(Path::new("blog/b.md"), "permission denied").expect("log");

        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "blog/a.md: stream did not contain valid UTF-8\nblog/b.md: permission denied\n"
        );
        assert_eq!(log.written(), 2);
    }
}
