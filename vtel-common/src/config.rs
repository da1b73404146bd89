//! Configuration loading and API target resolution
//!
//! Bootstrap configuration is a small TOML file. Every value has a compiled
//! default, so a missing file is never fatal.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--base-url`, `--target`, `--token`)
//! 2. Environment variables (`VTEL_API_BASE_URL`, `VTEL_API_TARGET`, `VTEL_API_TOKEN`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const ENV_BASE_URL: &str = "VTEL_API_BASE_URL";
pub const ENV_TARGET: &str = "VTEL_API_TARGET";
pub const ENV_TOKEN: &str = "VTEL_API_TOKEN";

const DEFAULT_LOCAL_URL: &str = "http://localhost:5000/api";
const DEFAULT_PROXY_URL: &str = "/api";
const DEFAULT_PRODUCTION_URL: &str = "https://api.vtel.example/api";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_DEBOUNCE_MS: u64 = 300;

// ============================================================================
// API target
// ============================================================================

/// Which backend deployment requests are sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiTarget {
    /// Local development backend
    #[default]
    Local,
    /// Same-origin proxy path
    Proxy,
    Production,
}

impl fmt::Display for ApiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiTarget::Local => "local",
            ApiTarget::Proxy => "proxy",
            ApiTarget::Production => "production",
        };
        f.write_str(name)
    }
}

impl FromStr for ApiTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "development" | "dev" => Ok(ApiTarget::Local),
            "proxy" => Ok(ApiTarget::Proxy),
            "production" | "prod" => Ok(ApiTarget::Production),
            other => Err(Error::Config(format!("Unknown API target: {}", other))),
        }
    }
}

// ============================================================================
// TOML bootstrap file
// ============================================================================

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Backend deployment to talk to (default: local)
    #[serde(default)]
    pub target: Option<ApiTarget>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[api]` section
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_local_url")]
    pub local_url: String,

    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    #[serde(default = "default_production_url")]
    pub production_url: String,

    /// Explicit base URL, bypasses target selection
    #[serde(default)]
    pub base_url: Option<String>,

    /// Transport timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Debounce window for GET requests in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            local_url: default_local_url(),
            proxy_url: default_proxy_url(),
            production_url: default_production_url(),
            base_url: None,
            timeout_ms: default_timeout_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl ApiConfig {
    /// Base URL configured for a target
    pub fn url_for(&self, target: ApiTarget) -> &str {
        match target {
            ApiTarget::Local => &self.local_url,
            ApiTarget::Proxy => &self.proxy_url,
            ApiTarget::Production => &self.production_url,
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Fallback bearer token used when no session token is stored
    #[serde(default)]
    pub static_token: Option<String>,

    /// File holding the login-session token (default: data dir)
    #[serde(default)]
    pub session_file: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_local_url() -> String {
    DEFAULT_LOCAL_URL.to_string()
}

fn default_proxy_url() -> String {
    DEFAULT_PROXY_URL.to_string()
}

fn default_production_url() -> String {
    DEFAULT_PRODUCTION_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a file
    ///
    /// A missing file yields the defaults with a warning. A file that exists
    /// but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path` if given, else from the platform default location
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) => Self::load(&path),
                None => {
                    warn!("Could not determine config directory, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }
}

/// Platform config file path: `<config_dir>/vtel/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vtel").join("config.toml"))
}

/// Platform session token path: `<data_dir>/vtel/session_token`
pub fn default_session_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("vtel").join("session_token"))
}

// ============================================================================
// Session token
// ============================================================================

/// Source of the bearer token sent with every request
///
/// The session file is re-read on every call so that a login performed by
/// another process is picked up without a restart. Token acquisition itself
/// happens elsewhere; this type only consumes the stored value.
#[derive(Debug, Clone, Default)]
pub struct TokenSource {
    session_file: Option<PathBuf>,
    static_token: Option<String>,
}

impl TokenSource {
    pub fn new(session_file: Option<PathBuf>, static_token: Option<String>) -> Self {
        Self {
            session_file,
            static_token: static_token.and_then(non_empty),
        }
    }

    /// Token source with only a fixed token (no session file)
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::new(None, Some(token.into()))
    }

    /// Token source that never yields a token
    pub fn none() -> Self {
        Self::default()
    }

    pub fn session_file(&self) -> Option<&Path> {
        self.session_file.as_deref()
    }

    /// Current token: stored session token first, static token second
    pub fn current(&self) -> Option<String> {
        self.session_token().or_else(|| self.static_token.clone())
    }

    fn session_token(&self) -> Option<String> {
        let path = self.session_file.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(content) => non_empty(content),
            Err(e) => {
                debug!("No session token at {:?}: {}", path, e);
                None
            }
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// Resolved client configuration
// ============================================================================

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub target: Option<ApiTarget>,
    pub token: Option<String>,
}

/// Fully resolved configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub target: ApiTarget,
    pub base_url: String,
    pub timeout: Duration,
    pub debounce_delay: Duration,
    pub token: TokenSource,
    pub log_level: String,
}

impl ClientConfig {
    /// Resolve configuration from overrides, environment, TOML and defaults
    pub fn resolve(toml_config: &TomlConfig, overrides: &ConfigOverrides) -> Result<Self> {
        let target = match overrides.target {
            Some(target) => target,
            None => match env_value(ENV_TARGET) {
                Some(value) => value.parse()?,
                None => toml_config.target.unwrap_or_default(),
            },
        };

        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| env_value(ENV_BASE_URL))
            .or_else(|| toml_config.api.base_url.clone())
            .unwrap_or_else(|| toml_config.api.url_for(target).to_string());

        if base_url.trim().is_empty() {
            return Err(Error::Config("API base URL is empty".to_string()));
        }

        let static_token = overrides
            .token
            .clone()
            .or_else(|| env_value(ENV_TOKEN))
            .or_else(|| toml_config.auth.static_token.clone());

        let session_file = toml_config
            .auth
            .session_file
            .clone()
            .or_else(default_session_file);

        info!("API target: {} ({})", target, base_url);

        Ok(Self {
            target,
            base_url,
            timeout: Duration::from_millis(toml_config.api.timeout_ms),
            debounce_delay: Duration::from_millis(toml_config.api.debounce_ms),
            token: TokenSource::new(session_file, static_token),
            log_level: toml_config.logging.level.clone(),
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(non_empty)
}
