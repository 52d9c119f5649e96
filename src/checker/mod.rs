// src/checker/mod.rs
// =============================================================================
// This module contains all link finding and link checking logic.
//
// Submodules:
// - urls: Pulls http(s) URLs out of any text with a regex
// - http: Makes HEAD requests to check if URLs are alive
// - markdown: Finds Markdown link constructs (with byte ranges) and nested links
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use.
// =============================================================================

mod http;
mod markdown;
mod urls;

// Re-export public items from submodules
// This lets users write `checker::extract_urls()` instead of
// `checker::urls::extract_urls()`
pub use http::{LinkCheckResult, LinkChecker};
pub use markdown::{drop_definitions_where, find_nested_links, link_destination, unlink_where, LinkNode};
pub use urls::{extract_urls, Denylist};
