// src/store/wordpress.rs
// =============================================================================
// ContentStore backed by the WordPress.com REST API.
//
// Endpoints used (relative to the API base, e.g.
// https://public-api.wordpress.com/rest):
//
//   create  POST v1.2/sites/{site}/posts/new         form body
//   update  POST v1.2/sites/{site}/posts/{id}/       form body
//   list    GET  v1.2/sites/{site}/posts/?category=&page=&number=&type=
//   delete  POST v1.1/sites/{site}/posts/delete/     JSON {"post_ids": [...]}
//   author  POST v1.2/sites/{site}/posts/{id}/       form author=""
//   media   GET  v1.1/sites/{site}/media/?page=&number=
//
// Every request carries "Authorization: Bearer <token>". The token is
// obtained elsewhere and passed in as Credentials.
// =============================================================================

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ContentStore, MediaItem, PostDraft, PostQuery, PostSummary, StoreError};
use crate::config::Credentials;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct WordPressStore {
    client: Client,
    api_base: String,
    site: String,
    credentials: Credentials,
}

// Shape of a list response; only "posts" matters
#[derive(Deserialize)]
struct PostList {
    #[serde(default)]
    posts: Vec<PostSummary>,
}

#[derive(Deserialize)]
struct MediaList {
    #[serde(default)]
    media: Vec<MediaItem>,
}

const MEDIA_PAGE_SIZE: u32 = 100;

impl WordPressStore {
    pub fn new(api_base: &str, site: &str, credentials: Credentials) -> Result<Self, StoreError> {
        if site.trim().is_empty() {
            return Err(StoreError::Config("site is empty".to_string()));
        }
        if credentials.token().is_empty() {
            return Err(StoreError::Config("access token is empty".to_string()));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            site: site.trim().to_string(),
            credentials,
        })
    }

    fn endpoint(&self, version: &str, path: &str) -> String {
        format!("{}/{}/sites/{}/{}", self.api_base, version, self.site, path)
    }

    async fn send_draft(&self, url: String, draft: &PostDraft) -> Result<PostSummary, StoreError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(self.credentials.token())
            .form(draft)
            .send()
            .await?;
        read_summary(response).await
    }
}

async fn read_summary(response: Response) -> Result<PostSummary, StoreError> {
    let status = response.status();
    if status != StatusCode::OK && status != StatusCode::CREATED {
        return Err(StoreError::Status(status.as_u16()));
    }
    response
        .json::<PostSummary>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

impl ContentStore for WordPressStore {
    async fn create(&self, draft: &PostDraft) -> Result<PostSummary, StoreError> {
        self.send_draft(self.endpoint("v1.2", "posts/new"), draft).await
    }

    async fn update(&self, id: u64, draft: &PostDraft) -> Result<PostSummary, StoreError> {
        self.send_draft(self.endpoint("v1.2", &format!("posts/{}/", id)), draft)
            .await
    }

    async fn delete(&self, ids: &[u64]) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.endpoint("v1.1", "posts/delete/"))
            .bearer_auth(self.credentials.token())
            .json(&json!({ "post_ids": ids }))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            other => Err(StoreError::Status(other.as_u16())),
        }
    }

    async fn list(&self, query: &PostQuery) -> Result<Vec<PostSummary>, StoreError> {
        let mut all_posts = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut params = vec![
                ("page", page.to_string()),
                ("number", query.per_page.to_string()),
                ("type", query.post_type.clone()),
            ];
            if let Some(category) = &query.category {
                params.push(("category", category.clone()));
            }

            let response = self
                .client
                .get(self.endpoint("v1.2", "posts/"))
                .bearer_auth(self.credentials.token())
                .query(&params)
                .send()
                .await?;

            if response.status() != StatusCode::OK {
                return Err(StoreError::Status(response.status().as_u16()));
            }

            let batch = response
                .json::<PostList>()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            if batch.posts.is_empty() {
                break;
            }

            println!("   Page {} obtained ({} posts)", page, batch.posts.len());
            all_posts.extend(batch.posts);
            page += 1;
        }

        Ok(all_posts)
    }

    async fn clear_author(&self, id: u64) -> Result<PostSummary, StoreError> {
        let response = self
            .client
            .post(self.endpoint("v1.2", &format!("posts/{}/", id)))
            .bearer_auth(self.credentials.token())
            .form(&[("author", "")])
            .send()
            .await?;
        read_summary(response).await
    }

    async fn list_media(&self) -> Result<Vec<MediaItem>, StoreError> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response = self
                .client
                .get(self.endpoint("v1.1", "media/"))
                .bearer_auth(self.credentials.token())
                .query(&[("page", page), ("number", MEDIA_PAGE_SIZE)])
                .send()
                .await?;

            if response.status() != StatusCode::OK {
                return Err(StoreError::Status(response.status().as_u16()));
            }

            let batch = response
                .json::<MediaList>()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            if batch.media.is_empty() {
                break;
            }
            items.extend(batch.media);
            page += 1;
        }

        Ok(items)
    }
}
