//! Error handling module
//!
//! Precondition failures raised by the engine. Data-quality findings (bias,
//! keyword conflicts) are never errors; they are returned as values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Trigram name outside the fixed 8-element ordering
    #[error("invalid trigram: {0}")]
    InvalidTrigram(String),

    /// Hexagram id outside 1-64
    #[error("hexagram id out of range (1-64): {0}")]
    HexagramOutOfRange(i64),

    /// Changing-line set is empty, oversized, duplicated or out of range
    #[error("invalid change set: {0}")]
    InvalidChangeSet(String),

    /// Caller-supplied target disagrees with the flipped source
    #[error("target hexagram mismatch: expected {expected}, got {got}")]
    TargetMismatch { expected: u8, got: u8 },

    /// Selection record failed validation
    #[error("invalid selection record: {0}")]
    InvalidSelection(String),

    /// Unknown main-line priority mode
    #[error("invalid priority mode: {0}")]
    InvalidPriorityMode(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for EngineError {
    fn from(e: figment::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}

impl EngineError {
    /// Stable machine-readable code for audit logs
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidTrigram(_) => "INVALID_TRIGRAM",
            EngineError::HexagramOutOfRange(_) => "HEXAGRAM_OUT_OF_RANGE",
            EngineError::InvalidChangeSet(_) => "INVALID_CHANGE_SET",
            EngineError::TargetMismatch { .. } => "TARGET_MISMATCH",
            EngineError::InvalidSelection(_) => "INVALID_SELECTION",
            EngineError::InvalidPriorityMode(_) => "INVALID_PRIORITY_MODE",
            EngineError::Config(_) => "CONFIG_ERROR",
            EngineError::Serialization(_) => "SERIALIZATION_ERROR",
            EngineError::Io(_) => "IO_ERROR",
        }
    }
}

/// Error record for audit output
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
    /// Input line the error refers to, if any
    pub line: Option<usize>,
}

impl ErrorRecord {
    /// Build a record from an engine error
    pub fn new(err: &EngineError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            line: None,
        }
    }

    /// Attach the input line number
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::InvalidTrigram("x".into()).code(),
            "INVALID_TRIGRAM"
        );
        assert_eq!(
            EngineError::TargetMismatch {
                expected: 1,
                got: 2
            }
            .code(),
            "TARGET_MISMATCH"
        );
    }

    #[test]
    fn test_error_record_with_line() {
        let err = EngineError::HexagramOutOfRange(65);
        let record = ErrorRecord::new(&err).with_line(7);

        assert_eq!(record.code, "HEXAGRAM_OUT_OF_RANGE");
        assert_eq!(record.line, Some(7));
        assert!(record.message.contains("65"));
    }
}
