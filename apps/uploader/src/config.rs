//! Uploader configuration file.
//!
//! Stored as TOML:
//! - Linux: `~/.config/resumio/uploader.toml`
//! - Windows: `%APPDATA%/resumio/uploader.toml`
//!
//! A missing file means defaults; command-line flags override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use resumio_upload::{RetryConfig, UploaderConfig};
use serde::{Deserialize, Serialize};

/// On-disk uploader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session negotiation URL.
    #[serde(default)]
    pub endpoint: String,

    /// JSON key carrying the object name when negotiating.
    #[serde(default = "default_file_key")]
    pub file_key: String,

    /// Bytes per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Content type used when none is given on the command line.
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Per-request timeout in seconds (0 = none).
    #[serde(default)]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetrySection,
}

/// `[retry]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_file_key() -> String {
    resumio_upload::DEFAULT_FILE_KEY.into()
}

fn default_chunk_size() -> usize {
    resumio_upload::DEFAULT_CHUNK_SIZE
}

fn default_content_type() -> String {
    "application/octet-stream".into()
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    15_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            file_key: default_file_key(),
            chunk_size: default_chunk_size(),
            content_type: default_content_type(),
            request_timeout_secs: 0,
            retry: RetrySection::default(),
        }
    }
}

impl Config {
    /// Loads `path`, or the default location when `None`. A missing file
    /// yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Library configuration for these settings.
    pub fn to_uploader_config(&self) -> UploaderConfig {
        UploaderConfig {
            session_endpoint: self.endpoint.clone(),
            file_key: self.file_key.clone(),
            chunk_size: self.chunk_size,
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
            retry: RetryConfig {
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
                backoff_factor: self.retry.backoff_factor,
            },
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("resumio")
            .join("uploader.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("resumio").join("uploader.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/resumio/uploader.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.endpoint.is_empty());
        assert_eq!(config.file_key, "fileName");
        assert_eq!(config.chunk_size, 8 * 1024 * 1024);
        assert_eq!(config.content_type, "application/octet-stream");
        assert_eq!(config.retry.initial_delay_ms, 250);
    }

    #[test]
    fn config_partial_toml() {
        let toml_str = r#"
            endpoint = "https://up.example/negotiate"

            [retry]
            max_delay_ms = 2000
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.endpoint, "https://up.example/negotiate");
        assert_eq!(config.chunk_size, 8 * 1024 * 1024);
        assert_eq!(config.retry.initial_delay_ms, 250);
        assert_eq!(config.retry.max_delay_ms, 2000);
    }

    #[test]
    fn converts_to_uploader_config() {
        let config = Config {
            endpoint: "http://x/negotiate".into(),
            request_timeout_secs: 30,
            ..Config::default()
        };
        let up = config.to_uploader_config();
        assert_eq!(up.session_endpoint, "http://x/negotiate");
        assert_eq!(up.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(up.retry, RetryConfig::default());
        assert!(up.validate().is_ok());

        let no_timeout = Config::default().to_uploader_config();
        assert!(no_timeout.request_timeout.is_none());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert!(config.endpoint.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("uploader.toml");
        std::fs::write(&path, "endpoint = \"http://h/n\"\nchunk_size = 262144\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.endpoint, "http://h/n");
        assert_eq!(config.chunk_size, 262_144);
    }

    #[test]
    fn load_rejects_bad_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("uploader.toml");
        std::fs::write(&path, "chunk_size = \"big\"").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn config_path_not_empty() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().contains("resumio"));
    }
}
