//! Trigram/hexagram matrix
//!
//! King Wen numbering has no closed-form derivation from the line pattern, so
//! the 8x8 table is declared as data and checked by `validate_completeness`
//! at startup rather than trusted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::models::hexagram::{self, HEXAGRAM_COUNT, TrigramPair};
use crate::models::trigram::Trigram;

/// Hexagram ids indexed `[upper][lower]`, both axes in `Trigram::ALL` order
/// (乾 兌 離 震 巽 坎 艮 坤).
pub const KING_WEN_TABLE: [[u8; 8]; 8] = [
    [1, 10, 13, 25, 44, 6, 33, 12],
    [43, 58, 49, 17, 28, 47, 31, 45],
    [14, 38, 30, 21, 50, 64, 56, 35],
    [34, 54, 55, 51, 32, 40, 62, 16],
    [9, 61, 37, 42, 57, 59, 53, 20],
    [5, 60, 63, 3, 48, 29, 39, 8],
    [26, 41, 22, 27, 18, 4, 52, 23],
    [11, 19, 36, 24, 46, 7, 15, 2],
];

/// Ids of the eight pure hexagrams, in `Trigram::ALL` order
pub const PURE_HEXAGRAMS: [u8; 8] = [1, 58, 30, 51, 57, 29, 52, 2];

/// Outcome of a completeness scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub complete: bool,
    /// Ids in 1-64 that never appear
    pub missing_ids: Vec<u8>,
    /// Ids that appear more than once
    pub duplicate_ids: Vec<u8>,
    /// Entries outside 1-64
    pub invalid_entries: Vec<u8>,
    /// Trigrams whose diagonal cell is not the expected pure hexagram
    pub diagonal_mismatches: Vec<Trigram>,
}

impl CompletenessReport {
    /// Scan an arbitrary candidate table
    pub fn scan(table: &[[u8; 8]; 8]) -> Self {
        let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
        let mut invalid_entries = Vec::new();

        for &id in table.iter().flatten() {
            if (1..=HEXAGRAM_COUNT as u8).contains(&id) {
                *counts.entry(id).or_insert(0) += 1;
            } else {
                invalid_entries.push(id);
            }
        }

        let missing_ids: Vec<u8> = (1..=HEXAGRAM_COUNT as u8)
            .filter(|id| !counts.contains_key(id))
            .collect();
        let duplicate_ids: Vec<u8> = counts
            .iter()
            .filter(|&(_, &n)| n > 1)
            .map(|(&id, _)| id)
            .collect();
        let diagonal_mismatches: Vec<Trigram> = Trigram::ALL
            .into_iter()
            .filter(|t| table[t.index()][t.index()] != PURE_HEXAGRAMS[t.index()])
            .collect();

        let complete = missing_ids.is_empty()
            && duplicate_ids.is_empty()
            && invalid_entries.is_empty()
            && diagonal_mismatches.is_empty();

        Self {
            complete,
            missing_ids,
            duplicate_ids,
            invalid_entries,
            diagonal_mismatches,
        }
    }
}

/// Which classical derivation produced a related hexagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// 錯卦: every line flipped
    Opposite,
    /// 綜卦: line order reversed
    Inverse,
    /// 互卦: lines 2-4 as lower, 3-5 as upper
    Nuclear,
}

/// The three classical derived hexagrams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedHexagrams {
    pub source: u8,
    pub opposite: u8,
    pub inverse: u8,
    pub nuclear: u8,
}

/// Bijective (upper, lower) <-> id lookup
#[derive(Debug, Clone)]
pub struct TrigramHexagramMatrix {
    table: [[u8; 8]; 8],
    pairs: [Option<TrigramPair>; HEXAGRAM_COUNT],
}

impl Default for TrigramHexagramMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl TrigramHexagramMatrix {
    /// Matrix over the reference King Wen table
    pub fn new() -> Self {
        Self::with_table(KING_WEN_TABLE)
    }

    /// Matrix over a caller-supplied table
    ///
    /// The table is not checked here; call `validate_completeness`. Where an
    /// id appears twice the first cell in row-major order wins on inversion.
    pub fn with_table(table: [[u8; 8]; 8]) -> Self {
        let mut pairs = [None; HEXAGRAM_COUNT];
        for upper in Trigram::ALL {
            for lower in Trigram::ALL {
                let id = table[upper.index()][lower.index()] as usize;
                if (1..=HEXAGRAM_COUNT).contains(&id) && pairs[id - 1].is_none() {
                    pairs[id - 1] = Some(TrigramPair::new(upper, lower));
                }
            }
        }
        Self { table, pairs }
    }

    /// Hexagram id for a typed trigram pair
    pub fn resolve(&self, upper: Trigram, lower: Trigram) -> u8 {
        self.table[upper.index()][lower.index()]
    }

    /// Hexagram id for trigram names (character, pinyin or image)
    pub fn resolve_names(&self, upper: &str, lower: &str) -> Result<u8> {
        let upper = Trigram::from_name(upper)?;
        let lower = Trigram::from_name(lower)?;
        Ok(self.resolve(upper, lower))
    }

    /// Trigram pair for a hexagram id
    pub fn invert(&self, hexagram_id: u8) -> Result<TrigramPair> {
        let id = hexagram::ensure_hexagram_id(hexagram_id as i64)?;
        self.pairs[id as usize - 1].ok_or(EngineError::HexagramOutOfRange(id as i64))
    }

    /// Self-check of the loaded table
    pub fn validate_completeness(&self) -> CompletenessReport {
        CompletenessReport::scan(&self.table)
    }

    /// Six line values, bottom to top
    pub fn lines(&self, hexagram_id: u8) -> Result<[bool; 6]> {
        Ok(self.invert(hexagram_id)?.lines())
    }

    /// Hexagram id for a line pattern
    pub fn from_lines(&self, lines: [bool; 6]) -> u8 {
        let pair = TrigramPair::from_lines(lines);
        self.resolve(pair.upper, pair.lower)
    }

    /// Flip the given 1-based positions and resolve the result
    ///
    /// Positions must already be validated to lie in 1-6.
    pub fn apply_changes(&self, hexagram_id: u8, positions: &[u8]) -> Result<u8> {
        let mut lines = self.lines(hexagram_id)?;
        for &p in positions {
            if !(1..=6).contains(&p) {
                return Err(EngineError::InvalidChangeSet(format!(
                    "position {p} outside 1-6"
                )));
            }
            lines[p as usize - 1] = !lines[p as usize - 1];
        }
        Ok(self.from_lines(lines))
    }

    /// One classical derived hexagram
    pub fn related(&self, hexagram_id: u8, relation: Relation) -> Result<u8> {
        let lines = self.lines(hexagram_id)?;
        let derived = match relation {
            Relation::Opposite => lines.map(|l| !l),
            Relation::Inverse => {
                let mut reversed = lines;
                reversed.reverse();
                reversed
            }
            Relation::Nuclear => [lines[1], lines[2], lines[3], lines[2], lines[3], lines[4]],
        };
        Ok(self.from_lines(derived))
    }

    /// All three classical derived hexagrams
    pub fn related_hexagrams(&self, hexagram_id: u8) -> Result<RelatedHexagrams> {
        Ok(RelatedHexagrams {
            source: hexagram_id,
            opposite: self.related(hexagram_id, Relation::Opposite)?,
            inverse: self.related(hexagram_id, Relation::Inverse)?,
            nuclear: self.related(hexagram_id, Relation::Nuclear)?,
        })
    }

    /// Traditional label of one line, e.g. 九五
    pub fn line_label(&self, hexagram_id: u8, position: u8) -> Result<String> {
        if !(1..=6).contains(&position) {
            return Err(EngineError::InvalidChangeSet(format!(
                "position {position} outside 1-6"
            )));
        }
        let lines = self.lines(hexagram_id)?;
        Ok(hexagram::line_label(position, lines[position as usize - 1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_table_is_complete() {
        let report = TrigramHexagramMatrix::new().validate_completeness();
        assert!(report.complete, "{report:?}");
        assert!(report.missing_ids.is_empty());
        assert!(report.duplicate_ids.is_empty());
    }

    #[test]
    fn test_scan_flags_broken_table() {
        let mut table = KING_WEN_TABLE;
        // 地天泰 overwritten with a second 坤為地
        table[7][0] = 2;
        let report = CompletenessReport::scan(&table);

        assert!(!report.complete);
        assert_eq!(report.missing_ids, vec![11]);
        assert_eq!(report.duplicate_ids, vec![2]);
        assert!(report.diagonal_mismatches.is_empty());
    }

    #[test]
    fn test_scan_flags_diagonal_and_invalid_entries() {
        let mut table = KING_WEN_TABLE;
        table[0][0] = 0;
        let report = CompletenessReport::scan(&table);

        assert!(!report.complete);
        assert_eq!(report.invalid_entries, vec![0]);
        assert_eq!(report.missing_ids, vec![1]);
        assert_eq!(report.diagonal_mismatches, vec![Trigram::Qian]);
    }

    #[test]
    fn test_lines_match_trigrams() {
        let matrix = TrigramHexagramMatrix::new();
        // 地天泰: earth over heaven
        assert_eq!(
            matrix.lines(11).unwrap(),
            [true, true, true, false, false, false]
        );
        assert_eq!(matrix.from_lines([true; 6]), 1);
        assert_eq!(matrix.from_lines([false; 6]), 2);
    }

    #[test]
    fn test_apply_changes() {
        let matrix = TrigramHexagramMatrix::new();
        // 乾 first line changes into 天風姤
        assert_eq!(matrix.apply_changes(1, &[1]).unwrap(), 44);
        assert_eq!(matrix.apply_changes(1, &[1, 2, 3, 4, 5, 6]).unwrap(), 2);
        assert_eq!(matrix.apply_changes(11, &[]).unwrap(), 11);
        assert!(matrix.apply_changes(1, &[7]).is_err());
    }

    #[test]
    fn test_related_hexagrams() {
        let matrix = TrigramHexagramMatrix::new();

        let tai = matrix.related_hexagrams(11).unwrap();
        assert_eq!(tai.opposite, 12);
        assert_eq!(tai.inverse, 12);
        assert_eq!(tai.nuclear, 54);

        // 水雷屯 inverts to 山水蒙
        assert_eq!(matrix.related(3, Relation::Inverse).unwrap(), 4);
        assert_eq!(matrix.related(3, Relation::Opposite).unwrap(), 50);
        assert_eq!(matrix.related(1, Relation::Nuclear).unwrap(), 1);
    }

    #[test]
    fn test_line_label() {
        let matrix = TrigramHexagramMatrix::new();
        assert_eq!(matrix.line_label(1, 5).unwrap(), "九五");
        assert_eq!(matrix.line_label(2, 1).unwrap(), "初六");
        assert_eq!(matrix.line_label(63, 6).unwrap(), "上六");
        assert!(matrix.line_label(1, 0).is_err());
    }
}
