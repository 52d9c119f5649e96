// src/report.rs
// =============================================================================
// CSV reports.
//
// - Failing links (sweep):  File, URL, Status Code       (appended per file)
// - Failing links (audit):  File, Failing URL            (appended per batch)
// - Nested links:           File, Nested Link Text, Nested Link URL
//                                                        (overwritten per run)
//
// Appending writes the header only when the file is new or empty, so a report
// can grow across several interrupted runs without repeating it.
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A row type with a fixed header.
pub trait ReportRow: Serialize {
    const HEADER: &'static [&'static str];
}

/// A URL that failed its liveness probe, as found in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailingLinkRecord {
    pub source_file: String,
    pub url: String,
    /// Empty cell when no HTTP response was obtained
    pub status_code: Option<u16>,
}

impl ReportRow for FailingLinkRecord {
    const HEADER: &'static [&'static str] = &["File", "URL", "Status Code"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub file: String,
    pub failing_url: String,
}

impl ReportRow for AuditRecord {
    const HEADER: &'static [&'static str] = &["File", "Failing URL"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedLinkRecord {
    pub file: String,
    pub text: String,
    pub url: String,
}

impl ReportRow for NestedLinkRecord {
    const HEADER: &'static [&'static str] = &["File", "Nested Link Text", "Nested Link URL"];
}

/// Appends `rows` to the CSV at `path`, writing the header first if needed.
pub fn append_rows<T: ReportRow>(path: &Path, rows: &[T]) -> Result<()> {
    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open report {}", path.display()))?;

    write_rows(file, needs_header, rows).with_context(|| format!("failed to write report {}", path.display()))
}

/// Replaces the CSV at `path` with a header plus `rows`.
pub fn overwrite_rows<T: ReportRow>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create report {}", path.display()))?;
    write_rows(file, true, rows).with_context(|| format!("failed to write report {}", path.display()))
}

fn write_rows<W: Write, T: ReportRow>(sink: W, header: bool, rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
    if header {
        writer.write_record(T::HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Audit-mode accumulator that flushes every `batch_size` files.
#[derive(Debug)]
pub struct BatchReport {
    path: PathBuf,
    batch_size: usize,
    pending: Vec<AuditRecord>,
    files_since_flush: usize,
    files_seen: usize,
    flushes: Vec<usize>,
}

impl BatchReport {
    pub fn new(path: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            path: path.into(),
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            files_since_flush: 0,
            files_seen: 0,
            flushes: Vec::new(),
        }
    }

    /// Adds one file's failing URLs and flushes on a batch boundary.
    pub fn push_file(&mut self, rows: Vec<AuditRecord>) -> Result<()> {
        self.pending.extend(rows);
        self.files_seen += 1;
        self.files_since_flush += 1;
        if self.files_seen % self.batch_size == 0 {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes whatever accumulated since the last flush. A no-op when no file
    /// was added since then.
    pub fn finish(&mut self) -> Result<()> {
        if self.files_since_flush > 0 {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        append_rows(&self.path, &self.pending)?;
        println!("   Updated CSV after processing {} files", self.files_seen);
        self.pending.clear();
        self.files_since_flush = 0;
        self.flushes.push(self.files_seen);
        Ok(())
    }

    /// File counts at which a flush happened.
    pub fn flushes(&self) -> &[usize] {
        &self.flushes
    }
}
