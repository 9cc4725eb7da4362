//! Changing-line interpretation
//!
//! Picks an interpretation mode from the number of changing lines and, for
//! two or three changes, a single main line backed by the others.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::models::hexagram::{self, LINES_PER_HEXAGRAM, OracleLine};
use crate::services::matrix::TrigramHexagramMatrix;

/// Ruler position preferred by the default rule
pub const RULER_POSITION: u8 = 5;

/// Main-line selection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityMode {
    /// Position 5 if changing, else the lowest changing line
    #[default]
    Default,
    /// Top-most changing line
    Highest,
    /// Middle of the sorted set (lower middle on even counts)
    Median,
}

impl std::fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityMode::Default => write!(f, "default"),
            PriorityMode::Highest => write!(f, "highest"),
            PriorityMode::Median => write!(f, "median"),
        }
    }
}

impl std::str::FromStr for PriorityMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(PriorityMode::Default),
            "highest" => Ok(PriorityMode::Highest),
            "median" => Ok(PriorityMode::Median),
            other => Err(EngineError::InvalidPriorityMode(other.to_string())),
        }
    }
}

/// Interpretation mode, fixed by the number of changing lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    /// One changing line
    SingleLine,
    /// Two or three: a main line with modifiers
    MainLineWithSupport,
    /// Four or five: read the before/after pair
    HexagramTransition,
    /// All six lines invert
    CompleteReversal,
}

impl FocusMode {
    pub fn for_change_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(FocusMode::SingleLine),
            2 | 3 => Some(FocusMode::MainLineWithSupport),
            4 | 5 => Some(FocusMode::HexagramTransition),
            6 => Some(FocusMode::CompleteReversal),
            _ => None,
        }
    }

    pub fn confidence(self) -> f64 {
        match self {
            FocusMode::SingleLine => 0.95,
            FocusMode::MainLineWithSupport => 0.8,
            FocusMode::HexagramTransition => 0.7,
            FocusMode::CompleteReversal => 0.9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FocusMode::SingleLine => "single_line",
            FocusMode::MainLineWithSupport => "main_line_with_support",
            FocusMode::HexagramTransition => "hexagram_transition",
            FocusMode::CompleteReversal => "complete_reversal",
        }
    }
}

impl std::fmt::Display for FocusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpretation of one transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretationResult {
    pub source_hexagram: u8,
    pub target_hexagram: u8,
    /// Sorted changing positions
    pub changed_lines: Vec<u8>,
    /// Positions that keep their polarity
    pub unchanged_lines: Vec<u8>,
    pub focus_mode: FocusMode,
    pub priority_mode: PriorityMode,
    /// Set for single-line and main-line modes only
    pub primary_line: Option<u8>,
    /// Label of the primary line on the source hexagram, e.g. 九五
    pub primary_label: Option<String>,
    pub secondary_lines: Vec<u8>,
    pub confidence: f64,
    /// Rare, high-salience outcome
    pub rare: bool,
    /// 用九 / 用六 when hexagram 1 or 2 fully reverses
    pub oracle_line: Option<OracleLine>,
}

/// Validate and sort a change set
pub fn validate_change_set(positions: &[u8]) -> Result<Vec<u8>> {
    if positions.is_empty() {
        return Err(EngineError::InvalidChangeSet("no changing lines".into()));
    }
    if positions.len() > LINES_PER_HEXAGRAM as usize {
        return Err(EngineError::InvalidChangeSet(format!(
            "{} positions given, at most 6 allowed",
            positions.len()
        )));
    }

    let mut sorted = positions.to_vec();
    sorted.sort_unstable();

    if let Some(&p) = sorted
        .iter()
        .find(|&&p| !(1..=LINES_PER_HEXAGRAM).contains(&p))
    {
        return Err(EngineError::InvalidChangeSet(format!(
            "position {p} outside 1-6"
        )));
    }
    if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(EngineError::InvalidChangeSet(format!(
            "position {} listed twice",
            pair[0]
        )));
    }

    Ok(sorted)
}

/// Pick the main line of a change set
///
/// Total and deterministic for any valid set.
pub fn select_main_line(positions: &[u8], mode: PriorityMode) -> Result<u8> {
    let sorted = validate_change_set(positions)?;
    // validate_change_set guarantees a non-empty set
    let lowest = sorted[0];
    let highest = sorted[sorted.len() - 1];

    let main = match mode {
        PriorityMode::Default => {
            if sorted.contains(&RULER_POSITION) {
                RULER_POSITION
            } else {
                lowest
            }
        }
        PriorityMode::Highest => highest,
        PriorityMode::Median => sorted[(sorted.len() - 1) / 2],
    };
    Ok(main)
}

/// Changing-line rule engine
#[derive(Debug, Clone, Default)]
pub struct LineChangeInterpreter {
    matrix: TrigramHexagramMatrix,
    default_mode: PriorityMode,
}

impl LineChangeInterpreter {
    pub fn new(matrix: TrigramHexagramMatrix) -> Self {
        Self {
            matrix,
            default_mode: PriorityMode::Default,
        }
    }

    /// Override the mode used by `interpret_default`
    pub fn with_priority_mode(mut self, mode: PriorityMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn matrix(&self) -> &TrigramHexagramMatrix {
        &self.matrix
    }

    /// Interpret with the configured mode and a derived target
    pub fn interpret_default(&self, source: u8, positions: &[u8]) -> Result<InterpretationResult> {
        self.interpret(source, positions, None, self.default_mode)
    }

    /// Interpret a transformation of `source`
    ///
    /// When `target` is given it must equal the hexagram obtained by flipping
    /// `positions` on `source`.
    pub fn interpret(
        &self,
        source: u8,
        positions: &[u8],
        target: Option<u8>,
        mode: PriorityMode,
    ) -> Result<InterpretationResult> {
        let source = hexagram::ensure_hexagram_id(source as i64)?;
        let changed = validate_change_set(positions)?;
        let derived = self.matrix.apply_changes(source, &changed)?;

        if let Some(given) = target {
            let given = hexagram::ensure_hexagram_id(given as i64)?;
            if given != derived {
                return Err(EngineError::TargetMismatch {
                    expected: derived,
                    got: given,
                });
            }
        }

        let focus_mode = FocusMode::for_change_count(changed.len()).ok_or_else(|| {
            EngineError::InvalidChangeSet(format!("{} changing lines", changed.len()))
        })?;

        let (primary_line, secondary_lines) = match focus_mode {
            FocusMode::SingleLine | FocusMode::MainLineWithSupport => {
                let main = select_main_line(&changed, mode)?;
                let rest = changed.iter().copied().filter(|&p| p != main).collect();
                (Some(main), rest)
            }
            FocusMode::HexagramTransition => (None, changed.clone()),
            FocusMode::CompleteReversal => (None, Vec::new()),
        };

        let primary_label = primary_line
            .map(|p| self.matrix.line_label(source, p))
            .transpose()?;

        let unchanged_lines = (1..=LINES_PER_HEXAGRAM)
            .filter(|p| !changed.contains(p))
            .collect();

        let rare = focus_mode == FocusMode::CompleteReversal;
        let oracle_line = if rare {
            OracleLine::for_hexagram(source)
        } else {
            None
        };

        debug!(
            source,
            target = derived,
            focus_mode = %focus_mode,
            primary_line = ?primary_line,
            "interpreted line change"
        );

        Ok(InterpretationResult {
            source_hexagram: source,
            target_hexagram: derived,
            changed_lines: changed,
            unchanged_lines,
            focus_mode,
            priority_mode: mode,
            primary_line,
            primary_label,
            secondary_lines,
            confidence: focus_mode.confidence(),
            rare,
            oracle_line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> LineChangeInterpreter {
        LineChangeInterpreter::new(TrigramHexagramMatrix::new())
    }

    #[test]
    fn test_select_main_line() {
        assert_eq!(select_main_line(&[2, 5, 6], PriorityMode::Default).unwrap(), 5);
        assert_eq!(select_main_line(&[1, 2, 3], PriorityMode::Default).unwrap(), 1);
        assert_eq!(select_main_line(&[1, 6], PriorityMode::Highest).unwrap(), 6);
        assert_eq!(select_main_line(&[6, 2, 4], PriorityMode::Median).unwrap(), 4);
        assert_eq!(select_main_line(&[3, 6], PriorityMode::Median).unwrap(), 3);
        assert_eq!(select_main_line(&[4], PriorityMode::Highest).unwrap(), 4);
    }

    #[test]
    fn test_validate_change_set() {
        assert_eq!(validate_change_set(&[6, 1, 3]).unwrap(), vec![1, 3, 6]);
        assert!(validate_change_set(&[]).is_err());
        assert!(validate_change_set(&[0]).is_err());
        assert!(validate_change_set(&[7]).is_err());
        assert!(validate_change_set(&[2, 2]).is_err());
        assert!(validate_change_set(&[1, 2, 3, 4, 5, 6, 1]).is_err());
    }

    #[test]
    fn test_single_line() {
        let result = interpreter()
            .interpret(1, &[1], Some(44), PriorityMode::Default)
            .unwrap();

        assert_eq!(result.focus_mode, FocusMode::SingleLine);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.primary_line, Some(1));
        assert_eq!(result.primary_label.as_deref(), Some("初九"));
        assert!(result.secondary_lines.is_empty());
        assert_eq!(result.unchanged_lines, vec![2, 3, 4, 5, 6]);
        assert!(!result.rare);
    }

    #[test]
    fn test_main_line_with_support() {
        let result = interpreter()
            .interpret(11, &[6, 2, 5], None, PriorityMode::Default)
            .unwrap();

        assert_eq!(result.focus_mode, FocusMode::MainLineWithSupport);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.changed_lines, vec![2, 5, 6]);
        assert_eq!(result.primary_line, Some(5));
        assert_eq!(result.secondary_lines, vec![2, 6]);
        // 地天泰 fifth line is yin
        assert_eq!(result.primary_label.as_deref(), Some("六五"));
    }

    #[test]
    fn test_transition_and_reversal() {
        let engine = interpreter();

        let transition = engine
            .interpret(1, &[1, 2, 3, 4], None, PriorityMode::Default)
            .unwrap();
        assert_eq!(transition.focus_mode, FocusMode::HexagramTransition);
        assert_eq!(transition.confidence, 0.7);
        assert_eq!(transition.primary_line, None);
        assert_eq!(transition.secondary_lines, vec![1, 2, 3, 4]);
        assert_eq!(transition.unchanged_lines, vec![5, 6]);
        // upper 巽, lower 坤: 風地観
        assert_eq!(transition.target_hexagram, 20);

        let reversal = engine
            .interpret(2, &[1, 2, 3, 4, 5, 6], Some(1), PriorityMode::Highest)
            .unwrap();
        assert_eq!(reversal.focus_mode, FocusMode::CompleteReversal);
        assert_eq!(reversal.confidence, 0.9);
        assert!(reversal.rare);
        assert_eq!(reversal.oracle_line, Some(OracleLine::UseSix));
        assert!(reversal.unchanged_lines.is_empty());
    }

    #[test]
    fn test_errors() {
        let engine = interpreter();
        assert!(matches!(
            engine.interpret(1, &[], None, PriorityMode::Default),
            Err(EngineError::InvalidChangeSet(_))
        ));
        assert!(matches!(
            engine.interpret(65, &[1], None, PriorityMode::Default),
            Err(EngineError::HexagramOutOfRange(65))
        ));
        assert!(matches!(
            engine.interpret(1, &[1], Some(2), PriorityMode::Default),
            Err(EngineError::TargetMismatch {
                expected: 44,
                got: 2
            })
        ));
    }

    #[test]
    fn test_priority_mode_parse() {
        assert_eq!("Highest".parse::<PriorityMode>().unwrap(), PriorityMode::Highest);
        assert_eq!(PriorityMode::Median.to_string(), "median");
        assert!("ruler".parse::<PriorityMode>().is_err());
    }

    #[test]
    fn test_interpret_default_uses_configured_mode() {
        let engine = interpreter().with_priority_mode(PriorityMode::Highest);
        let result = engine.interpret_default(1, &[1, 5]).unwrap();
        assert_eq!(result.primary_line, Some(5));
        assert_eq!(result.priority_mode, PriorityMode::Highest);

        let result = engine.interpret_default(1, &[1, 3]).unwrap();
        assert_eq!(result.primary_line, Some(3));
    }
}
