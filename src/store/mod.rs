// src/store/mod.rs
// =============================================================================
// This module talks to the content store (a WordPress.com site).
//
// Submodules:
// - wordpress: The REST implementation of ContentStore
// - publish: Builds post drafts from Markdown files and runs folder-wide
//   publish / update / export / delete operations
//
// The rest of the program only sees the ContentStore trait: create, update,
// delete and list posts keyed by numeric post ID. Tests plug in an in-memory
// store through the same trait.
//
// Rust concepts:
// - Traits with async fn: An interface whose methods return futures
// - thiserror: A typed error enum so callers can match on the status code
// =============================================================================

mod publish;
mod wordpress;

pub use publish::{
    clear_authors_from_index, delete_from_index, export_index, export_media, load_index,
    publish_folder, update_from_index, DraftDefaults, SyncSummary,
};
pub use wordpress::WordPressStore;

use serde::{Deserialize, Serialize};

/// Everything sent to the store when creating or updating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Rendered HTML
    pub content: String,
    pub status: String,
    pub categories: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<u64>,
    #[serde(rename = "type")]
    pub post_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

/// The store's answer on success, also the row format of a JSON index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "URL", default)]
    pub url: String,
}

/// An uploaded file in the site's media library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mime_type: String,
}

/// Filters for listing posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub category: Option<String>,
    /// "post", "page" or "any"
    pub post_type: String,
    pub per_page: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("content store returned HTTP {0}")]
    Status(u16),
    #[error("content store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected content store response: {0}")]
    Decode(String),
    #[error("content store is not configured: {0}")]
    Config(String),
}

/// CRUD surface of the content store, keyed by post ID.
pub trait ContentStore {
    async fn create(&self, draft: &PostDraft) -> Result<PostSummary, StoreError>;

    async fn update(&self, id: u64, draft: &PostDraft) -> Result<PostSummary, StoreError>;

    async fn delete(&self, ids: &[u64]) -> Result<(), StoreError>;

    /// Every matching post, across all pages.
    async fn list(&self, query: &PostQuery) -> Result<Vec<PostSummary>, StoreError>;

    /// Unsets the post's author.
    async fn clear_author(&self, id: u64) -> Result<PostSummary, StoreError>;

    /// Every item in the media library, across all pages.
    async fn list_media(&self) -> Result<Vec<MediaItem>, StoreError>;
}
