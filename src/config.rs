use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Collector endpoint as host:port, dialed as ws://host:port/.
    pub server_addr: String,
    /// Static token sent as the Authorization header and in every report body.
    pub auth_token: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackoffConfig {
    #[serde(default = "default_min_wait_secs")]
    pub min_wait_secs: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_wait_secs: default_min_wait_secs(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let addr = self.server_addr.trim();
        if addr.is_empty() {
            return Err(ConfigError::Validation(
                "server_addr is required".to_string(),
            ));
        }
        if addr.contains("://") {
            return Err(ConfigError::Validation(
                "server_addr must be host:port without a scheme".to_string(),
            ));
        }
        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                if port.parse::<u16>().map_or(true, |p| p == 0) {
                    return Err(ConfigError::Validation(
                        "server_addr port must be in range 1..65535".to_string(),
                    ));
                }
            }
            _ => {
                return Err(ConfigError::Validation(
                    "server_addr must be a host:port address".to_string(),
                ));
            }
        }
        if self.auth_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "auth_token is required".to_string(),
            ));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval_secs must be >= 1".to_string(),
            ));
        }
        if self.backoff.min_wait_secs < 1 {
            return Err(ConfigError::Validation(
                "backoff.min_wait_secs must be >= 1".to_string(),
            ));
        }
        if self.backoff.max_wait_secs < self.backoff.min_wait_secs {
            return Err(ConfigError::Validation(
                "backoff.max_wait_secs must be >= backoff.min_wait_secs".to_string(),
            ));
        }

        Ok(())
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/", self.server_addr.trim())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

const fn default_interval_secs() -> u64 {
    60
}

const fn default_min_wait_secs() -> u64 {
    1
}

const fn default_max_wait_secs() -> u64 {
    64
}
