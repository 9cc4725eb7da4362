//! Engine services
//!
//! Each service is constructed explicitly from its config section; nothing
//! is registered globally.

pub mod bias_monitor;
pub mod cache;
pub mod keyword_conflict;
pub mod line_change;
pub mod matrix;
pub mod statistics;

use crate::config::{BiasConfig, InterpretationConfig, KeywordConfig};

pub use bias_monitor::{
    BiasReport, SelectionBiasMonitor, SelectionOutcome, SharedBiasMonitor, shared_monitor,
};
pub use cache::{CacheStats, FifoCache};
pub use keyword_conflict::{
    ConflictMap, KeywordAxis, KeywordConflictAnalyzer, Polarity, TensionSummary, TensionTheme,
    classify_keywords,
};
pub use line_change::{
    FocusMode, InterpretationResult, LineChangeInterpreter, PriorityMode, select_main_line,
};
pub use matrix::{CompletenessReport, RelatedHexagrams, Relation, TrigramHexagramMatrix};
pub use statistics::{ChiSquareResult, OutlierReport};

/// Interpreter over `matrix` using the configured priority mode
pub fn create_line_change_interpreter(
    matrix: TrigramHexagramMatrix,
    config: &InterpretationConfig,
) -> LineChangeInterpreter {
    LineChangeInterpreter::new(matrix).with_priority_mode(config.priority_mode)
}

pub fn create_bias_monitor(config: &BiasConfig) -> SelectionBiasMonitor {
    SelectionBiasMonitor::new(config.clone())
}

pub fn create_keyword_analyzer(config: &KeywordConfig) -> KeywordConflictAnalyzer {
    KeywordConflictAnalyzer::new(config)
}
