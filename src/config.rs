// src/config.rs
// =============================================================================
// This module loads the run configuration.
//
// Sources, lowest to highest priority:
// 1. Built-in defaults (the Default impls below)
// 2. A TOML file (link-sweeper.toml by default, optional)
// 3. Environment variables for the WordPress site and access token
//    (a .env file is loaded into the environment by main before this runs)
// 4. Command-line flags, applied by the subcommand handlers in main.rs
//
// The resulting SweepConfig is handed to each component explicitly; nothing
// reads configuration from global state.
//
// Rust concepts:
// - serde(default): Missing TOML keys fall back to Default::default()
// - Option<T>: Settings that may legitimately be unset
// - impl fmt::Debug by hand: To keep the access token out of logs
// =============================================================================

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "link-sweeper.toml";
pub const DEFAULT_WORDPRESS_API: &str = "https://public-api.wordpress.com/rest";

const ENV_ACCESS_TOKEN: &str = "WP_ACCESS_TOKEN";
const ENV_SITE: &str = "WP_SITE";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub links: LinksSection,
    #[serde(default)]
    pub files: FilesSection,
    #[serde(default)]
    pub wordpress: WordPressSection,
}

/// Settings for URL extraction and liveness probing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinksSection {
    /// Host suffixes that are never extracted (and so never probed or removed)
    pub denylist: Vec<String>,
    pub timeout_secs: u64,
    /// In-flight HEAD requests per file
    pub concurrency: usize,
    /// Files probed at the same time
    pub file_concurrency: usize,
}

impl Default for LinksSection {
    fn default() -> Self {
        Self {
            denylist: vec!["example.example2.com".to_string(), "example3.org".to_string()],
            timeout_secs: 5,
            concurrency: 16,
            file_concurrency: 4,
        }
    }
}

impl LinksSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// How a file is named inside a checkpoint log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKey {
    /// Bare file name ("post.md"); two files with the same name in
    /// different folders share one checkpoint entry
    #[default]
    FileName,
    /// Path relative to the walked directory ("2021/post.md")
    RelativePath,
}

/// Locations of the checkpoint logs, reports and error log.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    pub checkpoint: PathBuf,
    pub repair_checkpoint: PathBuf,
    pub publish_checkpoint: PathBuf,
    pub update_checkpoint: PathBuf,
    pub failing_report: PathBuf,
    pub audit_report: PathBuf,
    pub nested_report: PathBuf,
    pub error_log: PathBuf,
    pub batch_size: usize,
    pub checkpoint_key: CheckpointKey,
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            checkpoint: PathBuf::from("checkpoint.txt"),
            repair_checkpoint: PathBuf::from("checkpoint_empty_links.txt"),
            publish_checkpoint: PathBuf::from("publish_checkpoint.txt"),
            update_checkpoint: PathBuf::from("update_checkpoint.txt"),
            failing_report: PathBuf::from("failing_urls.csv"),
            audit_report: PathBuf::from("failing_links.csv"),
            nested_report: PathBuf::from("wrong_links.csv"),
            error_log: PathBuf::from("decoding_log_errors.txt"),
            batch_size: 100,
            checkpoint_key: CheckpointKey::FileName,
        }
    }
}

/// Content store settings. The site and token can come from the environment.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct WordPressSection {
    pub site: Option<String>,
    pub api_base: String,
    pub access_token: Option<String>,
    pub status: String,
    pub category: String,
    pub post_type: String,
    pub parent: Option<u64>,
    pub featured_image: Option<u64>,
    /// Prefix used to rebuild a post's public URL from its file name
    pub public_base_url: Option<String>,
    pub per_page: u32,
}

impl Default for WordPressSection {
    fn default() -> Self {
        Self {
            site: None,
            api_base: DEFAULT_WORDPRESS_API.to_string(),
            access_token: None,
            status: "publish".to_string(),
            category: "Blog".to_string(),
            post_type: "post".to_string(),
            parent: None,
            featured_image: None,
            public_base_url: None,
            per_page: 100,
        }
    }
}

impl fmt::Debug for WordPressSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordPressSection")
            .field("site", &self.site)
            .field("api_base", &self.api_base)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("status", &self.status)
            .field("category", &self.category)
            .field("post_type", &self.post_type)
            .field("parent", &self.parent)
            .field("featured_image", &self.featured_image)
            .field("public_base_url", &self.public_base_url)
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl WordPressSection {
    /// Resolve the site: env WP_SITE > config > None.
    pub fn site(&self) -> Option<String> {
        non_empty_env(ENV_SITE).or_else(|| self.site.clone())
    }

    /// Resolve the bearer token: env WP_ACCESS_TOKEN > config > None.
    pub fn credentials(&self) -> Option<Credentials> {
        non_empty_env(ENV_ACCESS_TOKEN)
            .or_else(|| self.access_token.clone())
            .map(Credentials::bearer)
    }
}

/// A bearer token obtained out-of-band (OAuth is not handled here).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

impl SweepConfig {
    /// Load a config from a TOML file. Returns defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = SweepConfig::load(&temp.path().join("absent.toml")).expect("load");
        assert_eq!(config.links.timeout_secs, 5);
        assert_eq!(config.files.batch_size, 100);
        assert_eq!(config.files.checkpoint, PathBuf::from("checkpoint.txt"));
        assert_eq!(config.files.checkpoint_key, CheckpointKey::FileName);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SweepConfig::from_toml(
            r#"
[links]
denylist = ["internal.example"]
concurrency = 2

[files]
batch_size = 25
checkpoint_key = "relative_path"

[wordpress]
site = "blog.example.com"
parent = 11
"#,
        )
        .expect("parse");

        assert_eq!(config.links.denylist, vec!["internal.example".to_string()]);
        assert_eq!(config.links.concurrency, 2);
        assert_eq!(config.links.timeout_secs, 5);
        assert_eq!(config.files.batch_size, 25);
        assert_eq!(config.files.checkpoint_key, CheckpointKey::RelativePath);
        assert_eq!(config.files.error_log, PathBuf::from("decoding_log_errors.txt"));
        assert_eq!(config.wordpress.site.as_deref(), Some("blog.example.com"));
        assert_eq!(config.wordpress.parent, Some(11));
        assert_eq!(config.wordpress.status, "publish");
    }

    #[test]
    fn debug_output_hides_token() {
        let section = WordPressSection {
            access_token: Some("s3cret".to_string()),
            ..WordPressSection::default()
        };
        let rendered = format!("{:?}", section);
        assert!(!rendered.contains("s3cret"));

        let credentials = Credentials::bearer(" s3cret \n");
        assert_eq!(credentials.token(), "s3cret");
        assert!(!format!("{:?}", credentials).contains("s3cret"));
    }

    #[test]
    fn timeout_never_zero() {
        let links = LinksSection {
            timeout_secs: 0,
            ..LinksSection::default()
        };
        assert_eq!(links.timeout(), Duration::from_secs(1));
    }
}
