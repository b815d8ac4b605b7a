//! Configuration loading for DZM catalog clients
//!
//! Settings are resolved per key in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_API_BASE_URL: &str = "DZM_API_BASE_URL";
pub const ENV_SESSION_TOKEN: &str = "DZM_SESSION_TOKEN";
pub const ENV_PAGE_SIZE: &str = "DZM_PAGE_SIZE";

/// Largest page the catalog's feed endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 50;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8001/api";
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Bootstrap configuration as written in the TOML file
///
/// Every key is optional; absent keys fall through to the compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Catalog API root, e.g. `https://dzamarket.example/api`
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Bearer token of the signed-in viewer
    #[serde(default)]
    pub session_token: Option<String>,

    /// Listings requested per feed page
    #[serde(default)]
    pub page_size: Option<u32>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub logging: LoggingConfig,
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

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the config file, falling back to defaults when it does not exist
    ///
    /// `path` overrides the platform default location. A file that exists
    /// but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using built-in defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded config file");
        Ok(config)
    }
}

/// Default config file location: `<config dir>/dzm/shorts.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dzm").join("shorts.toml"))
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base_url: Option<String>,
    pub session_token: Option<String>,
    pub page_size: Option<u32>,
    pub log_level: Option<String>,
}

/// Fully resolved client settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// API root without trailing slash
    pub api_base_url: String,
    pub session_token: Option<String>,
    /// Always within 1..=MAX_PAGE_SIZE
    pub page_size: u32,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl ClientSettings {
    /// Resolve settings from CLI, environment, TOML and compiled defaults
    pub fn resolve(cli: CliOverrides, toml: TomlConfig) -> Result<Self> {
        let api_base_url = cli
            .api_base_url
            .or_else(|| env_var(ENV_API_BASE_URL))
            .or(toml.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_base_url must be an http(s) URL: {}",
                api_base_url
            )));
        }

        let session_token = cli
            .session_token
            .or_else(|| env_var(ENV_SESSION_TOKEN))
            .or(toml.session_token)
            .filter(|t| !t.trim().is_empty());

        let env_page_size = match env_var(ENV_PAGE_SIZE) {
            Some(raw) => Some(raw.parse::<u32>().map_err(|e| {
                Error::InvalidInput(format!("{} is not a number: {}", ENV_PAGE_SIZE, e))
            })?),
            None => None,
        };

        let page_size = cli
            .page_size
            .or(env_page_size)
            .or(toml.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let request_timeout = Duration::from_secs(
            toml.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                .max(1),
        );

        let log_level = cli.log_level.unwrap_or(toml.logging.level);

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            session_token,
            page_size,
            request_timeout,
            log_level,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
