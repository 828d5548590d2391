//! Server configuration loading.
//!
//! Configuration comes from a TOML file (`gatehouse.toml` by default, or
//! the path in `GATEHOUSE_CONFIG`). A missing file yields the defaults;
//! a malformed file is a startup error.

use serde::Deserialize;

use gatehouse_auth::AuthConfig;
use gatehouse_auth::types::Client;

/// Root server configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: BindConfig,

    /// Authorization server configuration.
    pub auth: AuthConfig,

    /// Clients registered at startup.
    ///
    /// `client_secret` values here are plaintext and are hashed before
    /// registration; production deployments provision clients out of band.
    pub clients: Vec<Client>,
}

/// Bind address configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    /// Host to listen on.
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl BindConfig {
    /// Returns the socket address string.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// The path that failed.
        path: String,
        /// The underlying TOML error.
        source: toml::de::Error,
    },
}

/// Loads the server configuration.
///
/// A missing file is not an error; the defaults serve local development.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &str) -> Result<ServerConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ServerConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_string(),
                source,
            });
        }
    };

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Resolves the configuration path from the environment.
#[must_use]
pub fn resolve_config_path() -> String {
    std::env::var("GATEHOUSE_CONFIG").unwrap_or_else(|_| "gatehouse.toml".to_string())
}
