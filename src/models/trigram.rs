//! Trigram data model
//!
//! The eight trigrams in Fu Xi order. The ordering is shared by both axes of
//! the hexagram matrix, so `index()` doubles as the matrix row/column.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// One of the eight canonical three-line symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trigram {
    /// 乾 (heaven)
    #[serde(rename = "乾")]
    Qian,
    /// 兌 (lake)
    #[serde(rename = "兌")]
    Dui,
    /// 離 (fire)
    #[serde(rename = "離")]
    Li,
    /// 震 (thunder)
    #[serde(rename = "震")]
    Zhen,
    /// 巽 (wind)
    #[serde(rename = "巽")]
    Xun,
    /// 坎 (water)
    #[serde(rename = "坎")]
    Kan,
    /// 艮 (mountain)
    #[serde(rename = "艮")]
    Gen,
    /// 坤 (earth)
    #[serde(rename = "坤")]
    Kun,
}

impl Trigram {
    /// Fixed ordering used on both matrix axes
    pub const ALL: [Trigram; 8] = [
        Trigram::Qian,
        Trigram::Dui,
        Trigram::Li,
        Trigram::Zhen,
        Trigram::Xun,
        Trigram::Kan,
        Trigram::Gen,
        Trigram::Kun,
    ];

    /// 1-based id
    pub fn id(self) -> u8 {
        self.index() as u8 + 1
    }

    /// 0-based matrix index
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up by 1-based id
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1..=8 => Ok(Self::ALL[id as usize - 1]),
            _ => Err(EngineError::InvalidTrigram(format!("id {id}"))),
        }
    }

    /// Canonical character name
    pub fn name(self) -> &'static str {
        match self {
            Trigram::Qian => "乾",
            Trigram::Dui => "兌",
            Trigram::Li => "離",
            Trigram::Zhen => "震",
            Trigram::Xun => "巽",
            Trigram::Kan => "坎",
            Trigram::Gen => "艮",
            Trigram::Kun => "坤",
        }
    }

    pub fn pinyin(self) -> &'static str {
        match self {
            Trigram::Qian => "qian",
            Trigram::Dui => "dui",
            Trigram::Li => "li",
            Trigram::Zhen => "zhen",
            Trigram::Xun => "xun",
            Trigram::Kan => "kan",
            Trigram::Gen => "gen",
            Trigram::Kun => "kun",
        }
    }

    /// Natural image (天, 沢, 火, ...)
    pub fn image(self) -> &'static str {
        match self {
            Trigram::Qian => "天",
            Trigram::Dui => "沢",
            Trigram::Li => "火",
            Trigram::Zhen => "雷",
            Trigram::Xun => "風",
            Trigram::Kan => "水",
            Trigram::Gen => "山",
            Trigram::Kun => "地",
        }
    }

    /// Line values bottom to top, `true` = yang (solid)
    pub fn lines(self) -> [bool; 3] {
        match self {
            Trigram::Qian => [true, true, true],
            Trigram::Dui => [true, true, false],
            Trigram::Li => [true, false, true],
            Trigram::Zhen => [true, false, false],
            Trigram::Xun => [false, true, true],
            Trigram::Kan => [false, true, false],
            Trigram::Gen => [false, false, true],
            Trigram::Kun => [false, false, false],
        }
    }

    /// Inverse of `lines()`
    pub fn from_lines(lines: [bool; 3]) -> Self {
        // Every 3-bit pattern maps to exactly one trigram.
        match lines {
            [true, true, true] => Trigram::Qian,
            [true, true, false] => Trigram::Dui,
            [true, false, true] => Trigram::Li,
            [true, false, false] => Trigram::Zhen,
            [false, true, true] => Trigram::Xun,
            [false, true, false] => Trigram::Kan,
            [false, false, true] => Trigram::Gen,
            [false, false, false] => Trigram::Kun,
        }
    }

    /// Parse a character, pinyin or image name
    pub fn from_name(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| {
                t.name() == trimmed
                    || t.image() == trimmed
                    || t.pinyin().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| EngineError::InvalidTrigram(name.to_string()))
    }
}

impl std::fmt::Display for Trigram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Trigram {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_fixed_order() {
        for (i, t) in Trigram::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
            assert_eq!(t.id() as usize, i + 1);
            assert_eq!(Trigram::from_id(t.id()).unwrap(), *t);
        }
        assert!(Trigram::from_id(0).is_err());
        assert!(Trigram::from_id(9).is_err());
    }

    #[test]
    fn test_lines_round_trip() {
        for t in Trigram::ALL {
            assert_eq!(Trigram::from_lines(t.lines()), t);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Trigram::from_name("乾").unwrap(), Trigram::Qian);
        assert_eq!(Trigram::from_name("KAN").unwrap(), Trigram::Kan);
        assert_eq!(Trigram::from_name("山").unwrap(), Trigram::Gen);
        assert_eq!("巽".parse::<Trigram>().unwrap(), Trigram::Xun);

        let err = Trigram::from_name("太陽").unwrap_err();
        assert!(matches!(err, EngineError::InvalidTrigram(_)));
    }
}
