use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::services::line_change::PriorityMode;

/// Bias monitor thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasConfig {
    /// FIFO window size
    pub capacity: usize,
    /// Below this many records no test runs
    pub min_samples: usize,
    /// Max share of a single line id
    pub line_share_threshold: f64,
    /// Minimum (non-sentinel) samples for the position chi-square test
    pub position_chi_min_samples: usize,
    /// Minimum samples for the hexagram chi-square test
    pub hexagram_chi_min_samples: usize,
    /// Minimum expected count per category
    pub min_expected_count: f64,
    /// Significance level
    pub alpha: f64,
    /// Max run of identical consecutive line ids
    pub max_consecutive_repeats: usize,
    /// Max share of a single position (sentinels excluded)
    pub position_share_cap: f64,
    /// Max combined share of the two sentinel lines
    pub sentinel_share_cap: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            min_samples: 30,
            line_share_threshold: 0.30,
            position_chi_min_samples: 60,
            hexagram_chi_min_samples: 320,
            min_expected_count: 5.0,
            alpha: 0.05,
            max_consecutive_repeats: 5,
            position_share_cap: 0.30,
            sentinel_share_cap: 0.01,
        }
    }
}

/// Keyword conflict analyzer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Memoized pair results kept before FIFO eviction
    pub cache_capacity: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 150,
        }
    }
}

/// Line change interpreter settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InterpretationConfig {
    /// Main-line rule used when the caller does not pick one
    pub priority_mode: PriorityMode,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// JSON output
    pub structured: bool,
    /// Daily rolling log directory
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub bias: BiasConfig,
    pub keyword: KeywordConfig,
    pub interpretation: InterpretationConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Development profile: verbose logs
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".into();
        config
    }

    /// Production profile: JSON logs
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.structured = true;
        config
    }
}
