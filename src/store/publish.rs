// src/store/publish.rs
// =============================================================================
// Turning Markdown files into posts, and folder-wide store operations.
//
// A draft is built from a file by:
// 1. Decoding it (see encoding.rs)
// 2. Reading `title: "..."` and `post_excerpt: "..."` from the front matter
//    (falling back to the first heading for the title)
// 3. Dropping the leading `---` front matter block
// 4. Rendering the rest to HTML with pulldown-cmark
//
// Folder operations look at the top level of a folder only (no recursion),
// in file name order. Publish and update are checkpointed by file name, so
// a rerun after an interruption neither double-publishes nor re-sends
// updates that already went through.
// =============================================================================

use anyhow::{Context, Result};
use pulldown_cmark::{html, Event, HeadingLevel, Parser, Tag};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{ContentStore, MediaItem, PostDraft, PostQuery, PostSummary};
use crate::encoding::DecodedDocument;
use crate::ledger::Ledger;
use crate::mutate::ErrorLog;
use crate::walker::MARKDOWN_SUFFIX;

/// Values every draft gets that do not come from the file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftDefaults {
    pub status: String,
    pub category: String,
    pub post_type: String,
    pub parent: Option<u64>,
    pub featured_image: Option<u64>,
}

/// Counters for a folder-wide store operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub files: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl SyncSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.not_found > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FrontMatter {
    title: Option<String>,
    excerpt: Option<String>,
}

fn title_regex() -> &'static Regex {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    TITLE.get_or_init(|| Regex::new(r#"title:\s*"([^"]+)""#).expect("title pattern compiles"))
}

fn excerpt_regex() -> &'static Regex {
    static EXCERPT: OnceLock<Regex> = OnceLock::new();
    EXCERPT.get_or_init(|| {
        Regex::new(r#"post_excerpt:\s*"([^"]+)""#).expect("excerpt pattern compiles")
    })
}

fn front_matter_regex() -> &'static Regex {
    static FRONT_MATTER: OnceLock<Regex> = OnceLock::new();
    // Only a block that opens the document counts
    FRONT_MATTER.get_or_init(|| {
        Regex::new(r"\A\u{FEFF}?---[ \t]*\r?\n(?s:.*?)\r?\n---[ \t]*(?:\r?\n|\z)")
            .expect("front matter pattern compiles")
    })
}

fn parse_front_matter(markdown: &str) -> FrontMatter {
    let capture = |re: &Regex| {
        re.captures(markdown)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    };
    FrontMatter {
        title: capture(title_regex()),
        excerpt: capture(excerpt_regex()),
    }
}

fn strip_front_matter(markdown: &str) -> &str {
    match front_matter_regex().find(markdown) {
        Some(block) => &markdown[block.end()..],
        None => markdown,
    }
}

// Plain text of the first level-1 heading, else of the first heading at all
fn first_heading(markdown: &str) -> Option<String> {
    let mut best: Option<(HeadingLevel, String)> = None;
    let mut current: Option<(HeadingLevel, String)> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading(level, ..)) => current = Some((level, String::new())),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&text);
                }
            }
            Event::End(Tag::Heading(..)) => {
                if let Some((level, text)) = current.take() {
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    if level == HeadingLevel::H1 {
                        return Some(text);
                    }
                    if best.is_none() {
                        best = Some((level, text));
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(_, text)| text)
}

/// The lookup title of a Markdown document.
pub fn document_title(markdown: &str) -> Option<String> {
    parse_front_matter(markdown)
        .title
        .or_else(|| first_heading(strip_front_matter(markdown)))
}

/// Renders the body (front matter removed) to HTML.
pub fn render_html(markdown: &str) -> String {
    let body = strip_front_matter(markdown);
    let mut output = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut output, Parser::new(body));
    output
}

pub fn build_draft(markdown: &str, defaults: &DraftDefaults) -> PostDraft {
    let front = parse_front_matter(markdown);
    PostDraft {
        title: front.title.or_else(|| first_heading(strip_front_matter(markdown))),
        content: render_html(markdown),
        status: defaults.status.clone(),
        categories: defaults.category.clone(),
        excerpt: front.excerpt,
        featured_image: defaults.featured_image,
        post_type: defaults.post_type.clone(),
        parent: defaults.parent,
    }
}

fn read_markdown(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(DecodedDocument::from_bytes(&bytes).text)
}

// Top-level Markdown files in `folder`, by name
fn folder_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("failed to list {}", folder.display()))? {
        let entry = entry.with_context(|| format!("failed to list {}", folder.display()))?;
        let is_markdown = entry.file_name().to_str().is_some_and(|n| n.ends_with(MARKDOWN_SUFFIX));
        if is_markdown && entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Creates one post per Markdown file in `folder`.
pub async fn publish_folder<S: ContentStore>(
    store: &S,
    folder: &Path,
    defaults: &DraftDefaults,
    checkpoint: &Path,
    error_log: &mut ErrorLog,
) -> Result<SyncSummary> {
    let mut ledger = Ledger::open(checkpoint)?;
    let mut summary = SyncSummary::default();

    for path in folder_files(folder)? {
        summary.files += 1;
        let name = file_name(&path);
        if ledger.contains(&name) {
            summary.skipped += 1;
            continue;
        }

        let markdown = match read_markdown(&path) {
            Ok(markdown) => markdown,
            Err(error) => {
                error_log.record(&path, &error);
                summary.failed += 1;
                continue;
            }
        };

        let draft = build_draft(&markdown, defaults);
        if draft.title.is_none() {
            error_log.log_message(&path, "title not found")?;
        }
        if draft.excerpt.is_none() {
            error_log.log_message(&path, "excerpt not found")?;
        }

        match store.create(&draft).await {
            Ok(post) => {
                println!("{} blogs uploaded: {} -> {} ({})", summary.succeeded + 1, name, post.id, post.url);
                ledger.mark_done(&name)?;
                summary.succeeded += 1;
            }
            Err(error) => {
                error_log.record(&path, &error.into());
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

/// Updates existing posts from the Markdown files in `folder`.
///
/// A file is matched to a post by its title first, then by the public URL
/// `public_base_url + <file stem> + "/"`.
pub async fn update_from_index<S: ContentStore>(
    store: &S,
    folder: &Path,
    index: &[PostSummary],
    defaults: &DraftDefaults,
    public_base_url: Option<&str>,
    checkpoint: &Path,
    error_log: &mut ErrorLog,
) -> Result<SyncSummary> {
    let title_to_id: HashMap<&str, u64> = index.iter().map(|p| (p.title.trim(), p.id)).collect();
    let url_to_id: HashMap<&str, u64> = index.iter().map(|p| (p.url.as_str(), p.id)).collect();

    let mut ledger = Ledger::open(checkpoint)?;
    let mut summary = SyncSummary::default();

    for path in folder_files(folder)? {
        summary.files += 1;
        let name = file_name(&path);
        if ledger.contains(&name) {
            summary.skipped += 1;
            continue;
        }

        let markdown = match read_markdown(&path) {
            Ok(markdown) => markdown,
            Err(error) => {
                error_log.record(&path, &error);
                summary.failed += 1;
                continue;
            }
        };

        let public_url = public_base_url.map(|base| public_url_for(base, &name));
        let by_title = document_title(&markdown).and_then(|title| title_to_id.get(title.as_str()).copied());
        let by_url = public_url.as_deref().and_then(|url| url_to_id.get(url).copied());

        let Some(post_id) = by_title.or(by_url) else {
            let message = format!(
                "No matching post found for '{}' in '{}'",
                public_url.as_deref().unwrap_or("-"),
                name
            );
            println!("{}", message);
            error_log.log_message(&path, &message)?;
            summary.not_found += 1;
            continue;
        };

        let draft = build_draft(&markdown, defaults);
        match store.update(post_id, &draft).await {
            Ok(post) => {
                println!("Updated {} -> {} ({})", name, post.id, post.url);
                ledger.mark_done(&name)?;
                summary.succeeded += 1;
            }
            Err(error) => {
                error_log.record(&path, &error.into());
                summary.failed += 1;
            }
        }
    }

    println!("Found: {} Not found: {}", summary.succeeded + summary.failed, summary.not_found);
    Ok(summary)
}

fn public_url_for(base: &str, file_name: &str) -> String {
    let stem = file_name.strip_suffix(MARKDOWN_SUFFIX).unwrap_or(file_name);
    format!("{}/{}/", base.trim_end_matches('/'), stem)
}

/// Lists every matching post and writes `[{ID, title, URL}]` to `output`.
pub async fn export_index<S: ContentStore>(store: &S, query: &PostQuery, output: &Path) -> Result<Vec<PostSummary>> {
    let posts = store.list(query).await?;
    let json = serde_json::to_string_pretty(&posts)?;
    fs::write(output, json).with_context(|| format!("failed to write {}", output.display()))?;
    Ok(posts)
}

pub fn load_index(path: &Path) -> Result<Vec<PostSummary>> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Deletes every post in `index` with one request. Returns how many IDs were sent.
pub async fn delete_from_index<S: ContentStore>(store: &S, index: &[PostSummary]) -> Result<usize> {
    let ids: Vec<u64> = index.iter().map(|post| post.id).collect();
    if ids.is_empty() {
        return Ok(0);
    }
    store.delete(&ids).await?;
    Ok(ids.len())
}

/// Unsets the author of every post in `index`, one request per post.
pub async fn clear_authors_from_index<S: ContentStore>(store: &S, index: &[PostSummary]) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();
    for post in index {
        summary.files += 1;
        match store.clear_author(post.id).await {
            Ok(_) => summary.succeeded += 1,
            Err(error) => {
                println!("Post {} ({}): {}", post.id, post.url, error);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

/// Lists the media library and writes it to `output` as JSON, so a
/// featured image ID can be picked for `[wordpress] featured_image`.
pub async fn export_media<S: ContentStore>(store: &S, output: &Path) -> Result<Vec<MediaItem>> {
    let media = store.list_media().await?;
    let json = serde_json::to_string_pretty(&media)?;
    fs::write(output, json).with_context(|| format!("failed to write {}", output.display()))?;
    Ok(media)
}
