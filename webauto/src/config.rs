//! Configuration management for webauto.
//!
//! Loads configuration from a TOML file. Every section and field has a
//! default, so an empty file (or no file at all) is a valid configuration.
//! Command line flags are applied on top by the binary.

use crate::sync::fingerprint::DEFAULT_CHUNK_SIZE;
use crate::utils::errors::{Result, WebautoError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub website: WebsiteConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Named credential profile (overridden by `--profile`)
    #[serde(default)]
    pub profile: Option<String>,

    /// Region for all clients; falls back to the profile's region
    #[serde(default)]
    pub region: Option<String>,

    /// Custom S3 endpoint (S3-compatible stores, local emulators)
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Chunk size in bytes, used for both fingerprints and multipart parts (default: 8MB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum files hashed and uploaded at the same time (1 = sequential)
    #[serde(default = "default_max_concurrent_uploads")]
    pub max_concurrent_uploads: usize,

    /// File or directory names skipped during the walk (substring match)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Follow symlinked files; symlinked directories are never descended
    #[serde(default = "default_follow_links")]
    pub follow_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteConfig {
    #[serde(default = "default_index_document")]
    pub index_document: String,

    #[serde(default = "default_error_document")]
    pub error_document: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_concurrent_uploads() -> usize {
    1
}

fn default_follow_links() -> bool {
    true
}

fn default_index_document() -> String {
    "index.html".to_string()
}

fn default_error_document() -> String {
    "error.html".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_concurrent_uploads: default_max_concurrent_uploads(),
            exclude_patterns: Vec::new(),
            follow_links: default_follow_links(),
        }
    }
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            index_document: default_index_document(),
            error_document: default_error_document(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| WebautoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync.chunk_size == 0 {
            return Err(WebautoError::Config("sync.chunk_size must be positive".into()));
        }
        if self.sync.max_concurrent_uploads == 0 {
            return Err(WebautoError::Config(
                "sync.max_concurrent_uploads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.sync.chunk_size, 8 * 1024 * 1024);
        assert_eq!(config.sync.max_concurrent_uploads, 1);
        assert!(config.sync.follow_links);
        assert_eq!(config.website.index_document, "index.html");
        assert_eq!(config.website.error_document, "error.html");
        assert_eq!(config.log.level, "info");
        assert!(config.aws.profile.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [aws]
            profile = "site"
            region = "eu-west-1"

            [sync]
            max_concurrent_uploads = 4
            exclude_patterns = [".git"]
            "#,
        )
        .unwrap();

        assert_eq!(config.aws.profile.as_deref(), Some("site"));
        assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.sync.max_concurrent_uploads, 4);
        assert_eq!(config.sync.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.sync.exclude_patterns, vec![".git".to_string()]);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = Config::from_toml("[sync]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, WebautoError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(Config::from_toml("[sync\nchunk_size = ").is_err());
    }
}
