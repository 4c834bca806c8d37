//! Configuration loading and typed config structures for the Gather service.
//!
//! The canonical configuration lives in `gather-config.yaml`. Every field
//! has a default, so an empty file (or no file at all) yields a working
//! local setup backed by the in-memory store. Environment variables
//! override the deployment-specific values.

use std::path::Path;

use serde::Deserialize;

use crate::percentile::TRENDING_PERCENTILE;
use crate::query::DEFAULT_PAGE_SIZE;

/// Value of `database.url` that selects the in-memory store.
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidOverride {
        /// The environment variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `gather-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GatherConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Relational store settings.
    #[serde(default)]
    pub database: DatabaseSection,

    /// Identity provider token verification.
    #[serde(default)]
    pub auth: AuthSection,

    /// Listing, featured and trending parameters.
    #[serde(default)]
    pub discovery: DiscoverySection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl GatherConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] for a malformed environment value.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::parse(&contents)?
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override deployment values from a variable lookup.
    ///
    /// - `DATABASE_URL` overrides `database.url`
    /// - `GATHER_HOST` overrides `server.host`
    /// - `GATHER_PORT` overrides `server.port`
    /// - `JWT_SECRET` overrides `auth.jwt_secret`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if `GATHER_PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("GATHER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("GATHER_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::InvalidOverride {
                name: "GATHER_PORT",
                value: format!("{val} ({e})"),
            })?;
        }
        if let Some(val) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = val;
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Relational store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSection {
    /// `PostgreSQL` URL, or `memory` for the in-memory store.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds before an idle connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Whether to run migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl DatabaseSection {
    /// Whether the in-memory store is selected.
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_DATABASE_URL
    }
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            run_migrations: default_true(),
        }
    }
}

/// Identity provider token verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthSection {
    /// HS256 secret shared with the identity provider. Empty disables
    /// authentication: every request is anonymous.
    #[serde(default)]
    pub jwt_secret: String,

    /// Expected `iss` claim, if the provider sets one.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Expected `aud` claim, if the provider sets one.
    #[serde(default)]
    pub audience: Option<String>,
}

/// Listing, featured and trending parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscoverySection {
    /// Events per search results page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Number of events on the landing page.
    #[serde(default = "default_featured_limit")]
    pub featured_limit: u32,

    /// Percentile of active scores above which an event is trending.
    #[serde(default = "default_trending_percentile")]
    pub trending_percentile: f64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            featured_limit: default_featured_limit(),
            trending_percentile: default_trending_percentile(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    MEMORY_DATABASE_URL.to_owned()
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_connect_timeout_secs() -> u64 {
    5
}

const fn default_idle_timeout_secs() -> u64 {
    300
}

const fn default_true() -> bool {
    true
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_featured_limit() -> u32 {
    6
}

const fn default_trending_percentile() -> f64 {
    TRENDING_PERCENTILE
}

fn default_log_level() -> String {
    "info".to_owned()
}
