// src/checker/markdown.rs
// =============================================================================
// This module finds link constructs in Markdown text.
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Can report the byte range in the source that produced each event
//
// The byte ranges are what make safe rewriting possible: a link is turned
// into a LinkNode {span, text, target}, and the mutator replaces exactly that
// span. URLs that merely appear in prose or inside code are never touched.
//
// Nested links ("[see [this](a) page](b)") are not links at all in
// CommonMark, so they are found with a separate bracket scanner.
//
// Rust concepts:
// - Range<usize>: A half-open byte range into the source string
// - Iterators: into_offset_iter() yields (Event, Range) pairs
// =============================================================================

use pulldown_cmark::{Event, LinkType, Parser, Tag};
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;

/// What kind of Markdown construct produced a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// [text](target) or [text](target "title")
    Inline,
    /// [text][ref], [text][] or [ref], resolved through a definition
    Reference,
    /// <https://...> or <someone@example.com>
    Autolink,
}

/// One link in the source, with byte ranges into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
    /// The whole construct, brackets and parentheses included
    pub span: Range<usize>,
    /// The link text between the square brackets
    pub text: Range<usize>,
    pub target: String,
    pub kind: LinkKind,
}

impl LinkNode {
    /// True for targets like "()" or "(   )".
    pub fn has_empty_target(&self) -> bool {
        self.target.trim().is_empty()
    }

    /// The text this link collapses to when it is unlinked.
    ///
    /// Autolinks have no separate text, so they disappear completely.
    pub fn replacement<'a>(&self, source: &'a str) -> &'a str {
        match self.kind {
            LinkKind::Autolink => "",
            LinkKind::Inline | LinkKind::Reference => &source[self.text.clone()],
        }
    }
}

// Tracks the link we are currently inside while walking events
struct OpenLink {
    span: Range<usize>,
    target: String,
    kind: LinkKind,
    text_end: usize,
}

/// Parses every link in `markdown`, in document order.
///
/// Images are not links and are not returned.
pub fn parse_links(markdown: &str) -> Vec<LinkNode> {
    let mut links = Vec::new();
    let mut current: Option<OpenLink> = None;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            // In pulldown-cmark 0.9, Link is Tag::Link(link_type, dest_url, title)
            Event::Start(Tag::Link(link_type, dest_url, _title)) => {
                current = Some(OpenLink {
                    text_end: range.start + 1,
                    span: range,
                    target: dest_url.to_string(),
                    kind: kind_of(link_type),
                });
            }

            Event::End(Tag::Link(..)) => {
                if let Some(open) = current.take() {
                    let text_start = (open.span.start + 1).min(open.span.end);
                    let text_end = open.text_end.clamp(text_start, open.span.end);
                    links.push(LinkNode {
                        span: open.span,
                        text: text_start..text_end,
                        target: open.target,
                        kind: open.kind,
                    });
                }
            }

            // Anything inside the link (text, emphasis, images, code) pushes
            // the end of the link text forward
            _ => {
                if let Some(open) = current.as_mut() {
                    open.text_end = open.text_end.max(range.end);
                }
            }
        }
    }

    links
}

fn kind_of(link_type: LinkType) -> LinkKind {
    match link_type {
        LinkType::Inline => LinkKind::Inline,
        LinkType::Autolink | LinkType::Email => LinkKind::Autolink,
        _ => LinkKind::Reference,
    }
}

/// Rebuilds `markdown`, replacing every link for which `unlink` returns true
/// with its text. Returns the new text and how many links were replaced.
pub fn unlink_where<F>(markdown: &str, mut unlink: F) -> (String, usize)
where
    F: FnMut(&LinkNode) -> bool,
{
    let mut output = String::with_capacity(markdown.len());
    let mut cursor = 0;
    let mut replaced = 0;

    for link in parse_links(markdown) {
        if link.span.start < cursor || !unlink(&link) {
            continue;
        }
        output.push_str(&markdown[cursor..link.span.start]);
        output.push_str(link.replacement(markdown));
        cursor = link.span.end;
        replaced += 1;
    }

    output.push_str(&markdown[cursor..]);
    (output, replaced)
}

/// The target a link written as `[x](raw)` resolves to.
///
/// pulldown-cmark removes backslash escapes and decodes entities in link
/// destinations, so `https://a.example/set\_up` becomes
/// `https://a.example/set_up`. Falls back to `raw` if it cannot be written
/// as a destination at all.
pub fn link_destination(raw: &str) -> String {
    let wrapped = format!("[x](<{}>)", raw);
    Parser::new(&wrapped)
        .find_map(|event| match event {
            Event::Start(Tag::Link(_, dest, _)) => Some(dest.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| raw.to_string())
}

/// Removes reference definitions (`[label]: target`) for which `should_drop`
/// returns true, unless a remaining link or image still resolves to the
/// same target. Returns the new text and how many definitions went away.
pub fn drop_definitions_where<F>(markdown: &str, mut should_drop: F) -> (String, usize)
where
    F: FnMut(&str) -> bool,
{
    let parser = Parser::new(markdown).into_offset_iter();
    let mut candidates: Vec<(Range<usize>, String)> = parser
        .reference_definitions()
        .iter()
        .filter(|(_, def)| should_drop(&*def.dest))
        .map(|(_, def)| (def.span.clone(), def.dest.to_string()))
        .collect();
    if candidates.is_empty() {
        return (markdown.to_string(), 0);
    }

    let in_use: HashSet<String> = parser
        .filter_map(|(event, _)| match event {
            Event::Start(Tag::Link(_, dest, _)) | Event::Start(Tag::Image(_, dest, _)) => {
                Some(dest.to_string())
            }
            _ => None,
        })
        .collect();
    candidates.retain(|(_, dest)| !in_use.contains(dest));
    candidates.sort_by_key(|(span, _)| span.start);

    let mut output = String::with_capacity(markdown.len());
    let mut cursor = 0;
    for (span, _) in &candidates {
        let line = whole_line(markdown, span.clone());
        if line.start < cursor {
            continue;
        }
        output.push_str(&markdown[cursor..line.start]);
        cursor = line.end;
    }
    output.push_str(&markdown[cursor..]);
    (output, candidates.len())
}

// Widens `span` over its indentation, trailing blanks and one line break
fn whole_line(markdown: &str, span: Range<usize>) -> Range<usize> {
    let bytes = markdown.as_bytes();
    let mut start = span.start;
    while start > 0 && matches!(bytes[start - 1], b' ' | b'\t') {
        start -= 1;
    }
    if start > 0 && bytes[start - 1] != b'\n' {
        // Something else shares the line; only the definition goes
        return span;
    }

    let mut end = span.end;
    while end < bytes.len() && matches!(bytes[end], b' ' | b'\t') {
        end += 1;
    }
    if bytes.get(end) == Some(&b'\r') {
        end += 1;
    }
    if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }
    start..end
}

/// A link whose text contains another link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedLink {
    pub text: String,
    pub url: String,
}

fn inner_link_regex() -> &'static Regex {
    static INNER_LINK: OnceLock<Regex> = OnceLock::new();
    // An inner [text](url) that is not an image
    INNER_LINK.get_or_init(|| {
        Regex::new(r"(?:^|[^!\\])\[[^\[\]]*\]\([^()]*\)").expect("inner link pattern compiles")
    })
}

/// Finds links whose text contains another Markdown link.
///
/// `[![badge](img.svg)](https://ci)` is fine (an image inside a link);
/// `[see [docs](a) here](b)` is reported as text "see [docs](a) here", url "b".
pub fn find_nested_links(markdown: &str) -> Vec<NestedLink> {
    let bytes = markdown.as_bytes();
    let mut found = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] != b'[' || is_escaped(bytes, index) {
            index += 1;
            continue;
        }

        let Some(close) = matching(bytes, index, b'[', b']') else {
            index += 1;
            continue;
        };
        if bytes.get(close + 1) != Some(&b'(') {
            index += 1;
            continue;
        }
        let Some(paren_close) = matching(bytes, close + 1, b'(', b')') else {
            index += 1;
            continue;
        };

        let text = &markdown[index + 1..close];
        if inner_link_regex().is_match(text) {
            found.push(NestedLink {
                text: text.to_string(),
                url: markdown[close + 2..paren_close].trim().to_string(),
            });
            index = paren_close + 1;
        } else {
            index += 1;
        }
    }

    found
}

// Finds the byte index of the bracket closing the one at `open`
fn matching(bytes: &[u8], open: usize, left: u8, right: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &byte) in bytes[open..].iter().enumerate() {
        let position = open + offset;
        if byte == b'\n' && bytes.get(position + 1) == Some(&b'\n') {
            // A blank line ends the paragraph, and with it any link
            return None;
        }
        if is_escaped(bytes, position) {
            continue;
        }
        if byte == left {
            depth += 1;
        } else if byte == right {
            depth -= 1;
            if depth == 0 {
                return Some(position);
            }
        }
    }
    None
}

fn is_escaped(bytes: &[u8], position: usize) -> bool {
    let backslashes = bytes[..position]
        .iter()
        .rev()
        .take_while(|&&byte| byte == b'\\')
        .count();
    backslashes % 2 == 1
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why byte ranges instead of strings?
//    - Slicing `&source[range]` borrows from the original text, no copying
//    - Rebuilding a document is then just gluing slices back together
//    - Ranges from pulldown-cmark always fall on UTF-8 character boundaries
//
// 2. What does into_offset_iter() do?
//    - The plain Parser iterator yields events only
//    - into_offset_iter() yields (event, byte range) pairs
//    - For Start(Tag::Link) the range covers the whole [text](url) construct
//
// 3. What is OnceLock?
//    - A cell that is written once and then read many times
//    - We compile each regex on first use and reuse it afterwards
//
// 4. What is `let ... else`?
//    - `let Some(x) = expr else { ... };` binds x or runs the else block
//    - The else block must leave the scope (continue, return, break)
// -----------------------------------------------------------------------------
