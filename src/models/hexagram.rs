//! Hexagram data model
//!
//! A hexagram is an (upper, lower) trigram pair. Lines are numbered 1 (bottom)
//! to 6 (top); lines 1-3 belong to the lower trigram.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::models::trigram::Trigram;

/// Number of canonical hexagrams
pub const HEXAGRAM_COUNT: usize = 64;

/// Lines per hexagram
pub const LINES_PER_HEXAGRAM: u8 = 6;

/// Validate a hexagram id, accepting any integer input from upstream
pub fn ensure_hexagram_id(id: i64) -> Result<u8> {
    if (1..=HEXAGRAM_COUNT as i64).contains(&id) {
        Ok(id as u8)
    } else {
        Err(EngineError::HexagramOutOfRange(id))
    }
}

/// Upper/lower trigram pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrigramPair {
    /// Outer trigram (lines 4-6)
    pub upper: Trigram,
    /// Inner trigram (lines 1-3)
    pub lower: Trigram,
}

impl TrigramPair {
    pub fn new(upper: Trigram, lower: Trigram) -> Self {
        Self { upper, lower }
    }

    /// Both halves identical
    pub fn is_pure(&self) -> bool {
        self.upper == self.lower
    }

    /// Six line values, bottom to top
    pub fn lines(&self) -> [bool; 6] {
        let lower = self.lower.lines();
        let upper = self.upper.lines();
        [lower[0], lower[1], lower[2], upper[0], upper[1], upper[2]]
    }

    pub fn from_lines(lines: [bool; 6]) -> Self {
        Self {
            upper: Trigram::from_lines([lines[3], lines[4], lines[5]]),
            lower: Trigram::from_lines([lines[0], lines[1], lines[2]]),
        }
    }
}

impl std::fmt::Display for TrigramPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.upper, self.lower)
    }
}

/// The two oracle lines attached to the all-yang and all-yin hexagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OracleLine {
    /// 用九, hexagram 1
    #[serde(rename = "use_nine")]
    UseNine,
    /// 用六, hexagram 2
    #[serde(rename = "use_six")]
    UseSix,
}

impl OracleLine {
    /// Sentinel line id (also used as the position value)
    pub fn line_id(self) -> u16 {
        match self {
            OracleLine::UseNine => 385,
            OracleLine::UseSix => 386,
        }
    }

    /// The only hexagram this line may annotate
    pub fn hexagram_id(self) -> u8 {
        match self {
            OracleLine::UseNine => 1,
            OracleLine::UseSix => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OracleLine::UseNine => "用九",
            OracleLine::UseSix => "用六",
        }
    }

    pub fn from_line_id(id: u16) -> Option<Self> {
        match id {
            385 => Some(OracleLine::UseNine),
            386 => Some(OracleLine::UseSix),
            _ => None,
        }
    }

    pub fn for_hexagram(hexagram_id: u8) -> Option<Self> {
        match hexagram_id {
            1 => Some(OracleLine::UseNine),
            2 => Some(OracleLine::UseSix),
            _ => None,
        }
    }
}

/// Regular line id: `(hexagram - 1) * 6 + position`, 1-384
pub fn line_id(hexagram_id: u8, position: u8) -> Result<u16> {
    let hexagram_id = ensure_hexagram_id(hexagram_id as i64)?;
    if !(1..=LINES_PER_HEXAGRAM).contains(&position) {
        return Err(EngineError::InvalidChangeSet(format!(
            "position {position} outside 1-6"
        )));
    }
    Ok((hexagram_id as u16 - 1) * LINES_PER_HEXAGRAM as u16 + position as u16)
}

/// Traditional line label, e.g. 初九, 六二, 九五, 上六
pub fn line_label(position: u8, yang: bool) -> String {
    let number = if yang { "九" } else { "六" };
    match position {
        1 => format!("初{number}"),
        6 => format!("上{number}"),
        2 => format!("{number}二"),
        3 => format!("{number}三"),
        4 => format!("{number}四"),
        _ => format!("{number}五"),
    }
}
