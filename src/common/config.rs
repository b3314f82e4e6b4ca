//! Configuration loading for the wagerline service
//!
//! Reads an optional TOML file, applies `WAGERLINE_*` environment overrides and
//! validates the result before anything is built from it.

use crate::config::WagerlineConfig;
use crate::errors::{CasinoResult, ConfigurationError};
use crate::games::types::GameType;
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<WagerlineConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            WagerlineConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    fn load_from_file(&self, path: &str) -> CasinoResult<WagerlineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut WagerlineConfig) -> CasinoResult<()> {
        if let Ok(host) = env::var("WAGERLINE_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_env("WAGERLINE_PORT", "Invalid port number")? {
            config.server.port = port;
        }
        if let Ok(origins) = env::var("WAGERLINE_CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(timeout) = parse_env("WAGERLINE_REQUEST_TIMEOUT", "Invalid timeout value")? {
            config.server.request_timeout_secs = timeout;
        }
        if let Some(flag) = parse_env("WAGERLINE_REQUIRE_MONTHLY_DEPOSIT", "Invalid boolean value")? {
            config.bonus.require_monthly_deposit = flag;
        }

        // Per-game RTP, e.g. WAGERLINE_DICE_RTP=95.5
        for game in GameType::ALL {
            let key = format!("WAGERLINE_{}_RTP", game.to_string().to_uppercase());
            if let Some(rtp) = parse_env(&key, "Invalid RTP value")? {
                config.games.get_mut(game).rtp = rtp;
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &WagerlineConfig, path: &str) -> CasinoResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_env<T: FromStr>(key: &str, reason: &str) -> Result<Option<T>, ConfigurationError> {
    match env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigurationError::InvalidValue {
            field: key.to_string(),
            value,
            reason: reason.to_string(),
        }),
        Err(_) => Ok(None),
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> CasinoResult<()> {
    let config = WagerlineConfig::default();
    let loader = ConfigLoader::new();
    loader.save(&config, path)
}
