// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Follows redirects and judges the final response
// - Only an exact 200 counts as live; every other outcome is failing
// - Runs checks concurrently with a bounded number of requests in flight
//
// There are no retries: one timeout means the URL is failing for this run.
//
// Rust concepts:
// - async/await: For concurrent network I/O
// - Option<u16>: "no HTTP response at all" is different from "HTTP 404"
// - Streams: For processing many items concurrently
// =============================================================================

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt}; // StreamExt gives us .buffer_unordered()
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("link-sweeper/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// The outcome of probing one URL.
///
/// `status_code` is None when no HTTP response was obtained at all
/// (timeout, DNS failure, refused connection, TLS failure...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCheckResult {
    pub url: String,
    pub status_code: Option<u16>,
}

impl LinkCheckResult {
    pub fn is_live(&self) -> bool {
        self.status_code == Some(StatusCode::OK.as_u16())
    }
}

/// Probes URLs with HEAD requests.
///
/// Cloning is cheap: the inner reqwest Client is reference counted.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
    concurrency: usize,
}

impl LinkChecker {
    pub fn new(timeout: Duration, concurrency: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            concurrency: concurrency.max(1),
        })
    }

    /// Checks every URL and returns one result per URL, in completion order.
    pub async fn check_links<I>(&self, urls: I) -> Vec<LinkCheckResult>
    where
        I: IntoIterator<Item = String>,
    {
        stream::iter(urls)
            .map(|url| self.check_single_link(url))
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Checks every URL and keeps only the failing ones.
    pub async fn failing_links<I>(&self, urls: I) -> Vec<LinkCheckResult>
    where
        I: IntoIterator<Item = String>,
    {
        let mut failing: Vec<_> = self
            .check_links(urls)
            .await
            .into_iter()
            .filter(|result| !result.is_live())
            .collect();
        // Completion order is random; reports read better sorted
        failing.sort_by(|a, b| a.url.cmp(&b.url));
        failing
    }

    async fn check_single_link(&self, url: String) -> LinkCheckResult {
        let result = match self.client.head(&url).send().await {
            Ok(response) => classify_response(url, response.status()),
            Err(error) => classify_error(url, &error),
        };

        match result.status_code {
            Some(200) => tracing::debug!(url = %result.url, "live"),
            Some(code) => tracing::info!(url = %result.url, status = code, "failing"),
            None => tracing::info!(url = %result.url, "failing without response"),
        }

        result
    }
}

fn classify_response(url: String, status: StatusCode) -> LinkCheckResult {
    LinkCheckResult {
        url,
        status_code: Some(status.as_u16()),
    }
}

// reqwest only attaches a status to errors raised from a response
// (error_for_status); transport failures carry none.
fn classify_error(url: String, error: &reqwest::Error) -> LinkCheckResult {
    tracing::debug!(url = %url, error = %error, "request failed");
    LinkCheckResult {
        url,
        status_code: error.status().map(|status| status.as_u16()),
    }
}
