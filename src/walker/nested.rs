// src/walker/nested.rs
// Scans every Markdown file for links nested inside other links' text.

use anyhow::Result;
use std::path::Path;

use super::{display_path, markdown_files, read_document};
use crate::checker::find_nested_links;
use crate::report::NestedLinkRecord;

pub fn find_nested_links_in(root: &Path) -> Result<Vec<NestedLinkRecord>> {
    let mut records = Vec::new();

    for (index, path) in markdown_files(root)?.into_iter().enumerate() {
        let document = match read_document(&path) {
            Ok(document) => document,
            Err(error) => {
                tracing::warn!(file = %path.display(), "{:#}", error);
                continue;
            }
        };

        let nested = find_nested_links(&document.text);
        println!("{} Processed files, Nested links found: {}", index + 1, nested.len());

        let file = display_path(root, &path);
        records.extend(nested.into_iter().map(|link| NestedLinkRecord {
            file: file.clone(),
            text: link.text,
            url: link.url,
        }));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn collects_records_across_files() {
        let blog = tempfile::tempdir().expect("blog dir");
        fs::create_dir_all(blog.path().join("sub")).expect("dir");
        fs::write(
            blog.path().join("sub/bad.md"),
            "Text [read [this](https://a.example) now](https://b.example)\n",
        )
        .expect("seed");
        fs::write(blog.path().join("good.md"), "[ok](https://c.example)\n").expect("seed");

        let records = find_nested_links_in(blog.path()).expect("scan");
        assert_eq!(
            records,
            vec![NestedLinkRecord {
                file: "sub/bad.md".to_string(),
                text: "read [this](https://a.example) now".to_string(),
                url: "https://b.example".to_string(),
            }]
        );
    }
}
