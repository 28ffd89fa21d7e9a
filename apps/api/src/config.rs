//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PDV_DB_PATH, PDV_PORT, PDV_BIND_ADDR, JWT_SECRET,                  │
//! │     JWT_LIFETIME_SECS, PDV_MAX_CONNECTIONS                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $PDV_CONFIG, or ./pdv.toml when present                            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # pdv.toml
//! db_path = "./data/pdv.db"
//! bind_addr = "0.0.0.0"
//! port = 8080
//! jwt_secret = "change-me"
//! jwt_lifetime_secs = 86400
//! max_connections = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// File read when neither an explicit path nor `PDV_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "pdv.toml";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// HS256 signing secret. Must be set; there is no built-in value.
    #[serde(default)]
    pub jwt_secret: String,

    /// Token lifetime in seconds (default: 24h).
    #[serde(default = "default_jwt_lifetime")]
    pub jwt_lifetime_secs: i64,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pdv.db")
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_jwt_lifetime() -> i64 {
    24 * 60 * 60
}

fn default_max_connections() -> u32 {
    5
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            port: default_port(),
            jwt_secret: String::new(),
            jwt_lifetime_secs: default_jwt_lifetime(),
            max_connections: default_max_connections(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration: defaults, then the TOML file, then environment.
    ///
    /// A missing file is not an error. A file that exists but cannot be
    /// read or parsed is.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path
            .or_else(|| std::env::var("PDV_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!(?path, "Loading config from file");
            Self::from_file(&path)?
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// `bind_addr:port`, ready for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "jwt_secret must be set (JWT_SECRET)".into(),
            ));
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be greater than 0".into()));
        }

        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::Invalid(
                "jwt_lifetime_secs must be greater than 0".into(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Unparseable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("PDV_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.db_path = PathBuf::from(path);
        }

        if let Some(port) = lookup("PDV_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }

        if let Some(addr) = lookup("PDV_BIND_ADDR") {
            self.bind_addr = addr;
        }

        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = secret;
        }

        if let Some(secs) = lookup("JWT_LIFETIME_SECS").and_then(|s| s.parse::<i64>().ok()) {
            self.jwt_lifetime_secs = secs;
        }

        if let Some(max) = lookup("PDV_MAX_CONNECTIONS").and_then(|m| m.parse::<u32>().ok()) {
            self.max_connections = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_file_values_fill_in_defaults() {
        let config: ApiConfig = toml::from_str(
            r#"
            jwt_secret = "s3cret"
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.db_path, PathBuf::from("pdv.db"));
        assert_eq!(config.jwt_lifetime_secs, 86400);
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("PDV_DB_PATH", "/tmp/pdv-test.db"),
            ("PDV_PORT", "3000"),
            ("JWT_SECRET", "from-env"),
            ("JWT_LIFETIME_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ApiConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/tmp/pdv-test.db"));
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_secret, "from-env");
        assert_eq!(config.jwt_lifetime_secs, 86400);
    }

    #[test]
    fn test_validation() {
        let config = ApiConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = ApiConfig {
            jwt_secret: "x".into(),
            port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            jwt_secret: "x".into(),
            jwt_lifetime_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
