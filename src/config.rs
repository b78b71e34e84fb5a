//! Configuration file parser for ~/.config/blogger-import/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos. The Blogger password is never read from here.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::blogger::Endpoints;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Command-line flags override whatever is set here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. Defaults to `blog.db` in the config directory.
    pub database_path: Option<PathBuf>,

    /// Domain of the local site imported entries are published on.
    pub site_domain: String,

    /// Display name used when the site is first registered.
    pub site_name: String,

    /// Blogger account; prompted for when absent.
    pub blogger_username: Option<String>,

    /// Category every imported entry is filed under; prompted for when absent.
    pub category_title: Option<String>,

    /// Blog to import; chosen interactively when absent.
    pub blog_id: Option<String>,

    /// Local username imported entries are attributed to.
    /// Absent means the first local user.
    pub author: Option<String>,

    pub login_url: String,

    pub api_base_url: String,

    /// Per-request timeout for Blogger requests.
    pub request_timeout_secs: u64,

    /// Console verbosity: 0 silent, 1 normal, 2 detailed.
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        let endpoints = Endpoints::default();
        Self {
            database_path: None,
            site_domain: "example.com".to_string(),
            site_name: "example.com".to_string(),
            blogger_username: None,
            category_title: None,
            blog_id: None,
            author: None,
            login_url: endpoints.login_url,
            api_base_url: endpoints.api_base,
            request_timeout_secs: 30,
            verbosity: 1,
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "database_path",
        "site_domain",
        "site_name",
        "blogger_username",
        "category_title",
        "blog_id",
        "author",
        "login_url",
        "api_base_url",
        "request_timeout_secs",
        "verbosity",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), site = %config.site_domain, "Loaded configuration");
        Ok(config)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            login_url: self.login_url.clone(),
            api_base: self.api_base_url.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("blogger_import_config_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_domain, "example.com");
        assert_eq!(config.verbosity, 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.endpoints(), Endpoints::default());
        assert!(config.author.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/blogger_import_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "site_domain = \"blog.example.org\"\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.site_domain, "blog.example.org");
        assert_eq!(config.verbosity, 1);
        assert_eq!(config.api_base_url, "https://www.blogger.com");

        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let content = r#"
database_path = "/var/lib/blog/blog.db"
site_domain = "blog.example.org"
site_name = "Example Blog"
blogger_username = "owner@example.com"
category_title = "From Blogger"
blog_id = "1234567890"
author = "admin"
login_url = "https://login.example.org/ClientLogin"
api_base_url = "https://feeds.example.org"
request_timeout_secs = 90
verbosity = 2
"#;
        let path = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.database_path.as_deref(),
            Some(Path::new("/var/lib/blog/blog.db"))
        );
        assert_eq!(config.site_name, "Example Blog");
        assert_eq!(config.blogger_username.as_deref(), Some("owner@example.com"));
        assert_eq!(config.category_title.as_deref(), Some("From Blogger"));
        assert_eq!(config.blog_id.as_deref(), Some("1234567890"));
        assert_eq!(config.author.as_deref(), Some("admin"));
        assert_eq!(config.endpoints().api_base, "https://feeds.example.org");
        assert_eq!(config.request_timeout(), Duration::from_secs(90));
        assert_eq!(config.verbosity, 2);

        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = r#"
site_domain = "example.com"
blogger_password = "should not be read"
another_unknown = 42
"#;
        let path = write_config("unknown", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.site_domain, "example.com");

        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        // verbosity should be an integer
        let path = write_config("wrongtype", "verbosity = \"loud\"\n");
        assert!(Config::load(&path).is_err());
        cleanup(&path);
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        cleanup(&path);
    }
}
