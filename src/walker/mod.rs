// src/walker/mod.rs
// =============================================================================
// This module drives whole-folder runs over Markdown files.
//
// Submodules:
// - sweep: find failing links and remove them (checkpointed)
// - audit: report failing links in batches, change nothing
// - repair: collapse "[text]()" links (checkpointed)
// - nested: report links whose text contains another link
//
// Every mode starts from markdown_files(), which walks the tree once up
// front. A failure to enumerate the tree is fatal; a failure on a single file
// is logged and the run moves on.
//
// Rust concepts:
// - walkdir: Recursive directory iteration with proper error reporting
// - Path / PathBuf: Borrowed and owned file system paths
// =============================================================================

mod audit;
mod nested;
mod repair;
mod sweep;

pub use audit::{audit_links, AuditSummary};
pub use nested::find_nested_links_in;
pub use repair::{repair_empty_links_in, RepairOptions};
pub use sweep::{sweep_dead_links, SweepOptions};

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CheckpointKey;
use crate::encoding::DecodedDocument;

pub const MARKDOWN_SUFFIX: &str = ".md";

/// Counters for a checkpointed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Markdown files found under the root
    pub discovered: usize,
    /// Already in the checkpoint log
    pub skipped: usize,
    /// Finished and checkpointed during this run
    pub processed: usize,
    /// Logged to the error log and left for the next run
    pub failed: usize,
    pub failing_links: usize,
    /// Link constructs collapsed to plain text
    pub links_removed: usize,
}

/// Lists every regular file under `root` whose name ends in ".md",
/// sorted by file name within each directory.
pub fn markdown_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_markdown = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(MARKDOWN_SUFFIX));
        if is_markdown {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// The identifier a file is recorded under in a checkpoint log.
pub fn checkpoint_id(root: &Path, path: &Path, key: CheckpointKey) -> String {
    match key {
        CheckpointKey::FileName => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned()),
        CheckpointKey::RelativePath => display_path(root, path),
    }
}

/// `path` relative to `root` with forward slashes, for logs and reports.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Reads and decodes one file, warning when bytes had to be replaced.
pub(crate) fn read_document(path: &Path) -> Result<DecodedDocument> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(decode_logged(path, &bytes))
}

pub(crate) fn decode_logged(path: &Path, bytes: &[u8]) -> DecodedDocument {
    let document = DecodedDocument::from_bytes(bytes);
    if document.lossy {
        tracing::warn!(
            file = %path.display(),
            encoding = document.encoding.name(),
            "undecodable bytes replaced"
        );
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_markdown_files_recursively() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("2021/drafts")).expect("dirs");
        fs::write(root.join("b.md"), "b").expect("b");
        fs::write(root.join("a.md"), "a").expect("a");
        fs::write(root.join("notes.txt"), "x").expect("txt");
        fs::write(root.join("README.MD"), "upper").expect("upper");
        fs::write(root.join("2021/drafts/c.md"), "c").expect("c");
        fs::create_dir_all(root.join("folder.md")).expect("dir named like a file");

        let files: Vec<String> = markdown_files(root)
            .expect("walk")
            .iter()
            .map(|p| display_path(root, p))
            .collect();

        assert_eq!(files, vec!["2021/drafts/c.md", "a.md", "b.md"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(markdown_files(&temp.path().join("absent")).is_err());
    }

    #[test]
    fn checkpoint_ids_follow_the_key() {
        let root = Path::new("/blog");
        let path = Path::new("/blog/2021/post.md");
        assert_eq!(checkpoint_id(root, path, CheckpointKey::FileName), "post.md");
        assert_eq!(checkpoint_id(root, path, CheckpointKey::RelativePath), "2021/post.md");
    }
}
