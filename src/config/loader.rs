use crate::config::config::{AppConfig, BiasConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "HEXAGRAM_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the default path
    ///
    /// Sources, later ones win:
    /// 1. built-in defaults
    /// 2. ./hexagram.toml
    /// 3. `HEXAGRAM_` environment variables (`HEXAGRAM_BIAS__ALPHA=0.01`)
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    /// Load only the bias section
    pub fn load_bias_config() -> Result<BiasConfig, figment::Error> {
        Self::figment(&default_config_path()).extract_inner("bias")
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        let bias = &config.bias;

        if bias.capacity == 0 {
            return Err(ConfigValidationError::ZeroCapacity("bias.capacity"));
        }
        if config.keyword.cache_capacity == 0 {
            return Err(ConfigValidationError::ZeroCapacity(
                "keyword.cache_capacity",
            ));
        }

        let ratios = [
            ("bias.line_share_threshold", bias.line_share_threshold),
            ("bias.alpha", bias.alpha),
            ("bias.position_share_cap", bias.position_share_cap),
            ("bias.sentinel_share_cap", bias.sentinel_share_cap),
        ];
        for (field, value) in ratios {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigValidationError::RatioOutOfRange { field, value });
            }
        }

        if bias.min_expected_count <= 0.0 {
            return Err(ConfigValidationError::InvalidExpectedCount(
                bias.min_expected_count,
            ));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("{0} must be greater than 0")]
    ZeroCapacity(&'static str),

    #[error("{field} must be in (0, 1], got {value}")]
    RatioOutOfRange { field: &'static str, value: f64 },

    #[error("bias.min_expected_count must be positive, got {0}")]
    InvalidExpectedCount(f64),
}

/// Default configuration file path
pub fn default_config_path() -> PathBuf {
    PathBuf::from("hexagram.toml")
}

/// Whether the default configuration file exists
pub fn config_exists() -> bool {
    default_config_path().exists()
}
