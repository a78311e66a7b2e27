//! Configuration management
//!
//! Configuration is loaded from a YAML file (`config.yml` by default) and
//! then overridden by `INKPOST_*` environment variables.
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Template override configuration
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Site presentation settings
    #[serde(default)]
    pub site: SiteConfig,
    /// Markdown rendering settings
    #[serde(default)]
    pub markdown: MarkdownConfig,
    /// Login session settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/inkpost.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

impl std::fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseDriver::Sqlite => write!(f, "sqlite"),
            DatabaseDriver::Mysql => write!(f, "mysql"),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Template override configuration
///
/// The built-in templates are always available; any `.html` file found
/// under `path` replaces the built-in template with the same relative name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory searched for template overrides
    #[serde(default = "default_theme_path")]
    pub path: PathBuf,

    /// Directory served at `/static` (the built stylesheet lives in `css/site.css`)
    #[serde(default = "default_static_path")]
    pub static_path: PathBuf,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            path: default_theme_path(),
            static_path: default_static_path(),
        }
    }
}

fn default_theme_path() -> PathBuf {
    PathBuf::from("templates")
}

fn default_static_path() -> PathBuf {
    PathBuf::from("static")
}

/// Site presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title shown in page headers
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Short description shown under the title
    #[serde(default)]
    pub description: String,
    /// Number of posts per page on the post list
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            description: String::new(),
            posts_per_page: default_posts_per_page(),
        }
    }
}

fn default_site_name() -> String {
    "Blog".to_string()
}

fn default_posts_per_page() -> u32 {
    10
}

/// Markdown rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// syntect theme used for fenced code blocks
    #[serde(default = "default_highlight_theme")]
    pub highlight_theme: String,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            highlight_theme: default_highlight_theme(),
        }
    }
}

fn default_highlight_theme() -> String {
    "base16-ocean.dark".to_string()
}

/// Login session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> u32 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file, apply `INKPOST_*` environment
    /// overrides and validate the result.
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.url must not be empty".to_string(),
            ));
        }
        if self.site.posts_per_page == 0 || self.site.posts_per_page > 100 {
            return Err(ConfigError::ValidationError(format!(
                "site.posts_per_page must be between 1 and 100, got {}",
                self.site.posts_per_page
            )));
        }
        if self.auth.session_days == 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration.
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("INKPOST_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("INKPOST_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("INKPOST_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("INKPOST_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("INKPOST_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parse::<u64>("INKPOST_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }
        if let Some(capacity) = env_parse::<u64>("INKPOST_CACHE_MAX_CAPACITY") {
            self.cache.max_capacity = capacity;
        }

        if let Ok(path) = std::env::var("INKPOST_THEME_PATH") {
            self.theme.path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("INKPOST_THEME_STATIC_PATH") {
            self.theme.static_path = PathBuf::from(path);
        }

        if let Ok(name) = std::env::var("INKPOST_SITE_NAME") {
            self.site.name = name;
        }
        if let Ok(description) = std::env::var("INKPOST_SITE_DESCRIPTION") {
            self.site.description = description;
        }
        if let Some(per_page) = env_parse::<u32>("INKPOST_SITE_POSTS_PER_PAGE") {
            self.site.posts_per_page = per_page;
        }

        if let Ok(theme) = std::env::var("INKPOST_MARKDOWN_HIGHLIGHT_THEME") {
            self.markdown.highlight_theme = theme;
        }

        if let Some(days) = env_parse::<u32>("INKPOST_AUTH_SESSION_DAYS") {
            self.auth.session_days = days;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by `tests` and `property_tests`, both of which touch process env.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "INKPOST_SERVER_HOST",
    "INKPOST_SERVER_PORT",
    "INKPOST_SERVER_CORS_ORIGIN",
    "INKPOST_DATABASE_DRIVER",
    "INKPOST_DATABASE_URL",
    "INKPOST_CACHE_TTL_SECONDS",
    "INKPOST_CACHE_MAX_CAPACITY",
    "INKPOST_THEME_PATH",
    "INKPOST_THEME_STATIC_PATH",
    "INKPOST_SITE_NAME",
    "INKPOST_SITE_DESCRIPTION",
    "INKPOST_SITE_POSTS_PER_PAGE",
    "INKPOST_MARKDOWN_HIGHLIGHT_THEME",
    "INKPOST_AUTH_SESSION_DAYS",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}
