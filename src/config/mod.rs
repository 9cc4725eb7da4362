//! Configuration module
//!
//! Threshold and logging settings loaded from `hexagram.toml` with
//! `HEXAGRAM_` environment overrides.

pub mod config;
pub mod loader;

pub use config::{AppConfig, BiasConfig, InterpretationConfig, KeywordConfig, LoggingConfig};
pub use loader::{ConfigLoader, ConfigValidationError};
