//! # Configuration
//!
//! Typed client configuration loaded from a TOML file, with sensible
//! defaults when no file is given and an environment override for the
//! backend URL.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

/// Environment variable that overrides `[api].base_url`.
pub const API_URL_ENV: &str = "SHAREAI_API_URL";

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: ClientConfig = load_config("config/shareai.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Complete client configuration.
///
/// # Example TOML
///
/// ```toml
/// [api]
/// base_url = "http://localhost:8080/api"
/// timeout_secs = 10
///
/// [storage]
/// state_dir = ".shareai"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Local state location (persisted token)
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the endpoint paths are joined to (e.g. "http://localhost:8080/api")
    pub base_url: String,
    /// Flat per-request timeout in seconds; on expiry the request fails as a
    /// network error
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Local state location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted session token (file named "token")
    pub state_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: ".shareai".to_string(),
        }
    }
}

impl ClientConfig {
    /// Resolve the effective configuration.
    ///
    /// Reads the TOML file when a path is given, otherwise starts from
    /// defaults, then applies the `SHAREAI_API_URL` environment override.
    ///
    /// # Arguments
    /// - `path`: Optional path to a TOML configuration file
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        let mut config: ClientConfig = match path {
            Some(p) => load_config(p)?,
            None => ClientConfig::default(),
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                config.api.base_url = url;
            }
        }

        Ok(config)
    }
}
