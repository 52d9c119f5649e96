// src/walker/repair.rs
// =============================================================================
// Checkpointed empty-link repair: "[text]()" becomes "text".
//
// No network here, so this runs synchronously, one file after another. A
// file is checkpointed once its rewrite (if any) has landed on disk.
// =============================================================================

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::{checkpoint_id, markdown_files, read_document, RunSummary};
use crate::config::CheckpointKey;
use crate::ledger::Ledger;
use crate::mutate::{repair_empty_links, write_atomic, ErrorLog};

#[derive(Debug, Clone)]
pub struct RepairOptions {
    pub checkpoint: PathBuf,
    pub error_log: PathBuf,
    pub key: CheckpointKey,
}

pub fn repair_empty_links_in(root: &Path, options: &RepairOptions) -> Result<RunSummary> {
    let mut ledger = Ledger::open(&options.checkpoint)?;
    let mut error_log = ErrorLog::new(&options.error_log);
    let files = markdown_files(root)?;

    let mut summary = RunSummary {
        discovered: files.len(),
        ..RunSummary::default()
    };

    let mut count = 0;
    for path in files {
        let id = checkpoint_id(root, &path, options.key);
        if ledger.contains(&id) {
            summary.skipped += 1;
            continue;
        }

        count += 1;
        println!("Processing file {}: {}", count, path.display());

        match repair_file(&path) {
            Ok(repaired) => {
                ledger.mark_done(&id)?;
                summary.processed += 1;
                summary.links_removed += repaired;
            }
            Err(error) => {
                error_log.record(&path, &error);
                summary.failed += 1;
            }
        }
    }

    println!("Total Markdown files processed: {}", summary.processed);
    Ok(summary)
}

fn repair_file(path: &Path) -> Result<usize> {
    let document = read_document(path)?;
    let rewrite = repair_empty_links(&document.text);
    if rewrite.changed() {
        write_atomic(path, &document.encode(&rewrite.text))?;
    }
    Ok(rewrite.unlinked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;
    use std::fs;

    fn options(dir: &Path) -> RepairOptions {
        RepairOptions {
            checkpoint: dir.join("checkpoint_empty_links.txt"),
            error_log: dir.join("errors.txt"),
            key: CheckpointKey::RelativePath,
        }
    }

    #[test]
    fn repairs_and_skips_on_rerun() {
        let state = tempfile::tempdir().expect("state dir");
        let blog = tempfile::tempdir().expect("blog dir");
        fs::create_dir_all(blog.path().join("2020")).expect("dir");
        let broken = blog.path().join("2020/broken.md");
        let clean = blog.path().join("clean.md");
        fs::write(&broken, "Read [the guide]() and [faq]( ).\n").expect("seed");
        fs::write(&clean, "[fine](https://a.example)\n").expect("seed");

        let options = options(state.path());
        let first = repair_empty_links_in(blog.path(), &options).expect("first");
        assert_eq!(first.processed, 2);
        assert_eq!(first.links_removed, 2);
        assert_eq!(fs::read_to_string(&broken).expect("read"), "Read the guide and faq.\n");
        assert_eq!(fs::read_to_string(&clean).expect("read"), "[fine](https://a.example)\n");

        let done = crate::ledger::load(&options.checkpoint).expect("ledger");
        assert!(done.contains("2020/broken.md"));
        assert!(done.contains("clean.md"));

        // Checkpointed files are not opened again, even if they changed since
        fs::write(&broken, "[again]()\n").expect("rewrite");
        let second = repair_empty_links_in(blog.path(), &options).expect("second");
        assert_eq!(second.processed, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(fs::read_to_string(&broken).expect("read"), "[again]()\n");
    }

    #[test]
    fn legacy_encoding_is_preserved() {
        let state = tempfile::tempdir().expect("state dir");
        let blog = tempfile::tempdir().expect("blog dir");
        let post = blog.path().join("menu.md");

        let text = "Les cr\u{e8}mes br\u{fb}l\u{e9}es de la maison sont d\u{e9}licieuses: [voir la carte]() pour les d\u{e9}tails.\n";
        let (bytes, _, _) = WINDOWS_1252.encode(text);
        fs::write(&post, bytes.as_ref()).expect("seed");

        repair_empty_links_in(blog.path(), &options(state.path())).expect("repair");

        let expected = "Les cr\u{e8}mes br\u{fb}l\u{e9}es de la maison sont d\u{e9}licieuses: voir la carte pour les d\u{e9}tails.\n";
        let (expected_bytes, _, _) = WINDOWS_1252.encode(expected);
        assert_eq!(fs::read(&post).expect("read"), expected_bytes.into_owned());
    }
}
