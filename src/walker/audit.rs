// src/walker/audit.rs
// =============================================================================
// Batch-report mode: find failing links everywhere, change nothing.
//
// There is no checkpoint here. Instead the report is flushed every
// `batch_size` files and once more at the end, so an interrupted audit still
// leaves every completed batch on disk and memory never holds more than one
// batch of rows.
// =============================================================================

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::Path;

use super::{decode_logged, display_path, markdown_files};
use crate::checker::{extract_urls, Denylist, LinkCheckResult, LinkChecker};
use crate::report::{AuditRecord, BatchReport};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub files: usize,
    pub failing_links: usize,
    /// Files that could not be read
    pub unreadable: usize,
    /// File counts at which the report was flushed
    pub flushes: Vec<usize>,
}

pub async fn audit_links(
    root: &Path,
    checker: &LinkChecker,
    denylist: &Denylist,
    report_path: &Path,
    batch_size: usize,
    file_concurrency: usize,
) -> Result<AuditSummary> {
    let files = markdown_files(root)?;
    let mut report = BatchReport::new(report_path, batch_size);
    let mut summary = AuditSummary::default();

    let mut probes = stream::iter(files)
        .map(|path| async move {
            let failing = failing_links_in(&path, checker, denylist).await;
            (path, failing)
        })
        .buffer_unordered(file_concurrency.max(1));

    while let Some((path, failing)) = probes.next().await {
        summary.files += 1;
        println!("Processing file {}: {}", summary.files, path.display());

        let rows = match failing {
            Ok(failing) => to_rows(root, &path, failing),
            Err(error) => {
                tracing::warn!(file = %path.display(), "{:#}", error);
                summary.unreadable += 1;
                Vec::new()
            }
        };
        summary.failing_links += rows.len();
        report.push_file(rows)?;
    }

    report.finish()?;
    summary.flushes = report.flushes().to_vec();

    println!("Total Markdown files processed: {}", summary.files);
    Ok(summary)
}

async fn failing_links_in(
    path: &Path,
    checker: &LinkChecker,
    denylist: &Denylist,
) -> Result<Vec<LinkCheckResult>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let document = decode_logged(path, &bytes);
    let urls = extract_urls(&document.text, denylist);
    Ok(checker.failing_links(urls).await)
}

fn to_rows(root: &Path, path: &Path, failing: Vec<LinkCheckResult>) -> Vec<AuditRecord> {
    let file = display_path(root, path);
    failing
        .into_iter()
        .map(|result| AuditRecord {
            file: file.clone(),
            failing_url: result.url,
        })
        .collect()
}
