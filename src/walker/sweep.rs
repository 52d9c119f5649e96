// src/walker/sweep.rs
// =============================================================================
// Checkpointed dead-link removal.
//
// Per run:
//   INIT   load the checkpoint log once, list the Markdown files
//   SKIP   files already in the log are not opened at all
//   PROBE  read + decode + extract URLs + HEAD every URL
//          (several files at once, several URLs per file at once)
//   COMMIT rewrite the file, append report rows, then checkpoint it
//   DONE   print the summary
//
// Only PROBE runs concurrently. Its results are drained one at a time by
// the loop in sweep_dead_links(), which is the single writer of the
// checkpoint log, the report and the error log.
//
// The checkpoint is written last: a crash before it means the file is probed
// again next run, never that its dead links are silently left behind.
// =============================================================================

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{checkpoint_id, decode_logged, display_path, markdown_files, RunSummary};
use crate::checker::{extract_urls, Denylist, LinkCheckResult, LinkChecker};
use crate::config::CheckpointKey;
use crate::encoding::DecodedDocument;
use crate::ledger::Ledger;
use crate::mutate::{remove_dead_links, write_atomic, ErrorLog};
use crate::report::{append_rows, FailingLinkRecord};

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub checkpoint: PathBuf,
    pub report: PathBuf,
    pub error_log: PathBuf,
    pub key: CheckpointKey,
    /// Files probed at the same time
    pub file_concurrency: usize,
}

// Everything learned about one file before it is modified
struct FileProbe {
    document: DecodedDocument,
    failing: Vec<LinkCheckResult>,
}

// The single writer of the checkpoint log, the report and the error log
struct Commit<'a> {
    root: &'a Path,
    report: &'a Path,
    ledger: Ledger,
    error_log: ErrorLog,
    summary: RunSummary,
}

impl Commit<'_> {
    /// Rewrites one probed file, reports its failing links, then checkpoints
    /// it. A per-file failure is logged and the file stays unchecked; only a
    /// failure to write the report or the checkpoint aborts the run.
    fn file(&mut self, path: &Path, id: &str, probe: Result<FileProbe>) -> Result<()> {
        let probe = match probe {
            Ok(probe) => probe,
            Err(error) => {
                self.error_log.record(path, &error);
                self.summary.failed += 1;
                return Ok(());
            }
        };

        let removed = match remove_from_file(path, &probe) {
            Ok(removed) => removed,
            Err(error) => {
                self.error_log.record(path, &error);
                self.summary.failed += 1;
                return Ok(());
            }
        };

        if !probe.failing.is_empty() {
            let source_file = display_path(self.root, path);
            let rows: Vec<FailingLinkRecord> = probe
                .failing
                .iter()
                .map(|result| FailingLinkRecord {
                    source_file: source_file.clone(),
                    url: result.url.clone(),
                    status_code: result.status_code,
                })
                .collect();
            append_rows(self.report, &rows)?;
        }

        self.ledger.mark_done(id)?;
        self.summary.processed += 1;
        self.summary.failing_links += probe.failing.len();
        self.summary.links_removed += removed;
        Ok(())
    }
}

/// Finds failing links in every unprocessed Markdown file under `root` and
/// removes them.
pub async fn sweep_dead_links(
    root: &Path,
    checker: &LinkChecker,
    denylist: &Denylist,
    options: &SweepOptions,
) -> Result<RunSummary> {
    let ledger = Ledger::open(&options.checkpoint)?;
    let error_log = ErrorLog::new(&options.error_log);
    let files = markdown_files(root)?;

    let mut summary = RunSummary {
        discovered: files.len(),
        ..RunSummary::default()
    };

    let mut pending = Vec::new();
    let mut queued = HashSet::new();
    for path in files {
        let id = checkpoint_id(root, &path, options.key);
        if ledger.contains(&id) {
            summary.skipped += 1;
            continue;
        }
        if !queued.insert(id.clone()) {
            tracing::warn!(
                file = %path.display(),
                id = %id,
                "another file in this run has the same checkpoint id"
            );
        }
        pending.push((path, id));
    }

    tracing::info!(
        checkpoint = %ledger.path().display(),
        done = ledger.len(),
        pending = pending.len(),
        "checkpoint loaded"
    );

    let mut probes = stream::iter(pending)
        .map(|(path, id)| async move {
            let probe = probe_file(&path, checker, denylist).await;
            (path, id, probe)
        })
        .buffer_unordered(options.file_concurrency.max(1));

    let mut commit = Commit {
        root,
        report: &options.report,
        ledger,
        error_log,
        summary,
    };

    let mut count = 0;
    while let Some((path, id, probe)) = probes.next().await {
        count += 1;
        println!("Processing file {}: {}", count, path.display());
        commit.file(&path, &id, probe)?;
    }

    let summary = commit.summary;
    println!("Total Markdown files processed: {}", summary.processed);
    Ok(summary)
}

async fn probe_file(path: &Path, checker: &LinkChecker, denylist: &Denylist) -> Result<FileProbe> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = decode_logged(path, &bytes);

    let urls = extract_urls(&document.text, denylist);
    tracing::debug!(file = %path.display(), urls = urls.len(), "probing");
    let failing = checker.failing_links(urls).await;

    Ok(FileProbe { document, failing })
}

// Returns how many link constructs were collapsed
fn remove_from_file(path: &Path, probe: &FileProbe) -> Result<usize> {
    if probe.failing.is_empty() {
        return Ok(0);
    }

    let dead: HashSet<&str> = probe.failing.iter().map(|r| r.url.as_str()).collect();
    let rewrite = remove_dead_links(&probe.document.text, &dead);
    if rewrite.changed() {
        write_atomic(path, &probe.document.encode(&rewrite.text))?;
    }
    Ok(rewrite.unlinked)
}
