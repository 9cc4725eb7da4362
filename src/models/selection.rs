//! Selection record model
//!
//! One record per inference event. Regular lines carry position 1-6; the two
//! oracle lines carry their sentinel id (385 / 386) in both `line_id` and
//! `position`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::hexagram::{self, HEXAGRAM_COUNT, LINES_PER_HEXAGRAM, OracleLine};

/// Highest valid line id (384 regular lines + 2 oracle lines)
pub const MAX_LINE_ID: u16 = 386;

/// A single symbolic selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    /// Line id, 1-386
    pub line_id: u16,
    /// Line position 1-6, or the sentinel id for oracle lines
    pub position: u16,
    /// Hexagram id, 1-64
    pub hexagram_id: u8,
    /// Event time, when the source recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SelectionRecord {
    /// Raw constructor; validated when added to a monitor
    pub fn new(line_id: u16, position: u16, hexagram_id: u8, timestamp: DateTime<Utc>) -> Self {
        Self {
            line_id,
            position,
            hexagram_id,
            timestamp: Some(timestamp),
        }
    }

    /// Record a regular line, deriving its line id
    pub fn line(hexagram_id: u8, position: u8) -> Result<Self> {
        let line_id = hexagram::line_id(hexagram_id, position)
            .map_err(|e| EngineError::InvalidSelection(e.to_string()))?;
        Ok(Self::new(
            line_id,
            position as u16,
            hexagram_id,
            Utc::now(),
        ))
    }

    /// Record an oracle line
    pub fn oracle(line: OracleLine) -> Self {
        Self::new(line.line_id(), line.line_id(), line.hexagram_id(), Utc::now())
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// True for 385 / 386
    pub fn is_sentinel(&self) -> bool {
        OracleLine::from_line_id(self.position).is_some()
    }

    /// Range and pairing checks
    pub fn validate(&self) -> Result<()> {
        if self.line_id == 0 || self.line_id > MAX_LINE_ID {
            return Err(EngineError::InvalidSelection(format!(
                "line id {} outside 1-{MAX_LINE_ID}",
                self.line_id
            )));
        }
        if self.hexagram_id == 0 || self.hexagram_id as usize > HEXAGRAM_COUNT {
            return Err(EngineError::InvalidSelection(format!(
                "hexagram id {} outside 1-64",
                self.hexagram_id
            )));
        }

        match OracleLine::from_line_id(self.position) {
            Some(oracle) => {
                if self.line_id != self.position {
                    return Err(EngineError::InvalidSelection(format!(
                        "sentinel position {} with line id {}",
                        self.position, self.line_id
                    )));
                }
                if self.hexagram_id != oracle.hexagram_id() {
                    return Err(EngineError::InvalidSelection(format!(
                        "{} is only valid on hexagram {}, got {}",
                        oracle.label(),
                        oracle.hexagram_id(),
                        self.hexagram_id
                    )));
                }
            }
            None => {
                if !(1..=LINES_PER_HEXAGRAM as u16).contains(&self.position) {
                    return Err(EngineError::InvalidSelection(format!(
                        "position {} outside 1-6",
                        self.position
                    )));
                }
                if OracleLine::from_line_id(self.line_id).is_some() {
                    return Err(EngineError::InvalidSelection(format!(
                        "line id {} requires a sentinel position",
                        self.line_id
                    )));
                }
                let expected = hexagram::line_id(self.hexagram_id, self.position as u8)
                    .map_err(|e| EngineError::InvalidSelection(e.to_string()))?;
                if self.line_id != expected {
                    return Err(EngineError::InvalidSelection(format!(
                        "line id {} does not match hexagram {} position {} (expected {expected})",
                        self.line_id, self.hexagram_id, self.position
                    )));
                }
            }
        }

        Ok(())
    }
}
