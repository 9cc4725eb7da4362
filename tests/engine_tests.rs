// Integration tests for the hexagram engine
//
// Tests cover:
// - Matrix bijection and pure hexagram placement
// - Changing-line interpretation modes
// - Selection bias detection over realistic streams
// - Keyword conflict analysis across characteristic profiles

use chrono::{DateTime, TimeZone, Utc};
use hexagram_engine::config::{AppConfig, BiasConfig, InterpretationConfig};
use hexagram_engine::error::EngineError;
use hexagram_engine::models::{HexagramCharacteristic, OracleLine, SelectionRecord, Trigram};
use hexagram_engine::services::{
    FocusMode, KeywordConflictAnalyzer, PriorityMode, SelectionBiasMonitor,
    TrigramHexagramMatrix, create_keyword_analyzer, create_line_change_interpreter,
    select_main_line,
};
use rstest::rstest;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// i-th record of a stream cycling through line ids 1-384
fn round_robin(i: usize) -> SelectionRecord {
    let hexagram = (i % 384 / 6) as u8 + 1;
    let position = (i % 6) as u8 + 1;
    SelectionRecord::line(hexagram, position)
        .unwrap()
        .at(at(i as i64))
}

// ============ Matrix Tests ============

#[test]
fn test_matrix_is_bijective() {
    let matrix = TrigramHexagramMatrix::new();
    assert!(matrix.validate_completeness().complete);

    for id in 1..=64u8 {
        let pair = matrix.invert(id).unwrap();
        assert_eq!(matrix.resolve(pair.upper, pair.lower), id);
    }
    for upper in Trigram::ALL {
        for lower in Trigram::ALL {
            let id = matrix.resolve(upper, lower);
            let pair = matrix.invert(id).unwrap();
            assert_eq!((pair.upper, pair.lower), (upper, lower));
        }
    }
}

#[rstest]
#[case("乾", 1)]
#[case("坤", 2)]
#[case("坎", 29)]
#[case("離", 30)]
#[case("震", 51)]
#[case("艮", 52)]
#[case("巽", 57)]
#[case("兌", 58)]
fn test_pure_hexagrams(#[case] name: &str, #[case] expected: u8) {
    let matrix = TrigramHexagramMatrix::new();
    assert_eq!(matrix.resolve_names(name, name).unwrap(), expected);
    assert!(matrix.invert(expected).unwrap().is_pure());
}

#[test]
fn test_matrix_rejects_bad_input() {
    let matrix = TrigramHexagramMatrix::new();
    assert!(matches!(
        matrix.resolve_names("乾", "月"),
        Err(EngineError::InvalidTrigram(_))
    ));
    assert!(matches!(
        matrix.invert(0),
        Err(EngineError::HexagramOutOfRange(0))
    ));
    assert!(matches!(
        matrix.invert(65),
        Err(EngineError::HexagramOutOfRange(65))
    ));
}

#[test]
fn test_resolve_names_accepts_aliases() {
    let matrix = TrigramHexagramMatrix::new();
    // 水雷屯
    assert_eq!(matrix.resolve_names("水", "雷").unwrap(), 3);
    assert_eq!(matrix.resolve_names("kan", "zhen").unwrap(), 3);
}

// ============ Interpretation Tests ============

#[rstest]
#[case(&[2, 5, 6], PriorityMode::Default, 5)]
#[case(&[1, 2, 3], PriorityMode::Default, 1)]
#[case(&[1, 6], PriorityMode::Highest, 6)]
#[case(&[1, 3, 6], PriorityMode::Median, 3)]
fn test_main_line_selection(
    #[case] lines: &[u8],
    #[case] mode: PriorityMode,
    #[case] expected: u8,
) {
    assert_eq!(select_main_line(lines, mode).unwrap(), expected);
    // deterministic
    assert_eq!(select_main_line(lines, mode).unwrap(), expected);
}

#[rstest]
#[case(&[3], FocusMode::SingleLine, 0.95)]
#[case(&[3, 4], FocusMode::MainLineWithSupport, 0.8)]
#[case(&[1, 3, 4, 6], FocusMode::HexagramTransition, 0.7)]
#[case(&[1, 2, 3, 4, 6], FocusMode::HexagramTransition, 0.7)]
#[case(&[1, 2, 3, 4, 5, 6], FocusMode::CompleteReversal, 0.9)]
fn test_focus_mode_by_change_count(
    #[case] lines: &[u8],
    #[case] mode: FocusMode,
    #[case] confidence: f64,
) {
    let interpreter = create_line_change_interpreter(
        TrigramHexagramMatrix::new(),
        &InterpretationConfig::default(),
    );
    let result = interpreter.interpret_default(29, lines).unwrap();

    assert_eq!(result.focus_mode, mode);
    assert_eq!(result.confidence, confidence);
    assert_eq!(result.changed_lines.len() + result.unchanged_lines.len(), 6);
}

#[test]
fn test_complete_reversal_of_heaven() {
    let interpreter = create_line_change_interpreter(
        TrigramHexagramMatrix::new(),
        &InterpretationConfig::default(),
    );
    let result = interpreter
        .interpret(1, &[6, 5, 4, 3, 2, 1], Some(2), PriorityMode::Default)
        .unwrap();

    assert!(result.rare);
    assert_eq!(result.primary_line, None);
    assert_eq!(result.oracle_line, Some(OracleLine::UseNine));
    assert_eq!(result.oracle_line.map(OracleLine::line_id), Some(385));
}

#[test]
fn test_target_must_match_flipped_source() {
    let interpreter = create_line_change_interpreter(
        TrigramHexagramMatrix::new(),
        &InterpretationConfig::default(),
    );
    let err = interpreter
        .interpret(11, &[1], Some(11), PriorityMode::Default)
        .unwrap_err();
    assert_eq!(err.code(), "TARGET_MISMATCH");
}

// ============ Bias Monitor Tests ============

#[test]
fn test_small_window_never_flags() {
    let mut monitor = SelectionBiasMonitor::default();
    for i in 0..29 {
        monitor
            .add_selection(SelectionRecord::line(1, 1).unwrap().at(at(i)))
            .unwrap();
    }
    assert!(!monitor.detect_bias());
}

#[rstest]
#[case(100)]
#[case(600)]
fn test_round_robin_stream_is_unbiased(#[case] capacity: usize) {
    let mut monitor = SelectionBiasMonitor::with_capacity(capacity);
    for i in 0..600 {
        monitor.add_selection(round_robin(i)).unwrap();
        assert!(!monitor.detect_bias(), "flagged after {} records", i + 1);
    }

    let report = monitor.report();
    assert_eq!(report.sample_size, capacity);
    assert!(report.position_chi_square.ran);
    assert_eq!(report.hexagram_chi_square.ran, capacity >= 320);
}

#[test]
fn test_position_skew_flags() {
    let mut monitor = SelectionBiasMonitor::default();
    for i in 0..60usize {
        let position = if i % 12 < 5 { 1 } else { (i % 5) as u8 + 2 };
        let hexagram = (i % 64) as u8 + 1;
        let record = SelectionRecord::line(hexagram, position)
            .unwrap()
            .at(at(i as i64));
        monitor.add_selection(record).unwrap();
    }

    let shares = monitor.position_shares();
    assert_eq!(shares.max_position, Some(1));
    assert!(shares.max_share > 0.4);
    assert!(monitor.detect_position_bias());
    assert!(monitor.detect_bias());
}

#[test]
fn test_oracle_lines_over_one_percent_flag() {
    let mut monitor = SelectionBiasMonitor::default();
    for i in 0..97 {
        monitor.add_selection(round_robin(i)).unwrap();
    }
    monitor
        .add_selection(SelectionRecord::oracle(OracleLine::UseNine).at(at(1_000)))
        .unwrap();
    monitor.add_selection(round_robin(97)).unwrap();
    monitor
        .add_selection(SelectionRecord::oracle(OracleLine::UseSix).at(at(1_001)))
        .unwrap();

    assert_eq!(monitor.len(), 100);
    assert!(monitor.detect_special_line_bias());
    assert!(monitor.detect_bias());
}

#[test]
fn test_hexagram_chi_square_flags_narrow_stream() {
    let config = BiasConfig {
        capacity: 400,
        ..BiasConfig::default()
    };
    let mut monitor = SelectionBiasMonitor::new(config);
    // only hexagrams 1-8, every position evenly
    for i in 0..400usize {
        let hexagram = (i / 6 % 8) as u8 + 1;
        let position = (i % 6) as u8 + 1;
        let record = SelectionRecord::line(hexagram, position)
            .unwrap()
            .at(at(i as i64));
        monitor.add_selection(record).unwrap();
    }

    let check = monitor.hexagram_chi_square();
    assert!(check.ran);
    assert!(check.flagged);
    assert!(!monitor.position_chi_square().flagged);
}

#[test]
fn test_selection_record_from_json() {
    let record: SelectionRecord =
        serde_json::from_str(r#"{"line_id": 386, "position": 386, "hexagram_id": 2}"#).unwrap();
    assert!(record.is_sentinel());

    let mut monitor = SelectionBiasMonitor::default();
    monitor.add_selection(record).unwrap();
    assert_eq!(monitor.frequency(386), 1);
}

// ============ Keyword Conflict Tests ============

fn profiles() -> Vec<HexagramCharacteristic> {
    vec![
        HexagramCharacteristic::new("乾為天", &["創造力", "リーダーシップ", "積極性"])
            .with_strength("決断力"),
        HexagramCharacteristic::new("坤為地", &["包容", "忍耐", "依存"]),
        HexagramCharacteristic::new("地天泰", &["調和", "繁栄", "安定"]),
        HexagramCharacteristic::new("天地否", &["断絶", "停滞", "閉塞"]),
        HexagramCharacteristic::new("沢火革", &["変革", "刷新", "決断"]),
    ]
}

#[test]
fn test_conflicts_are_symmetric() {
    let mut analyzer = KeywordConflictAnalyzer::default();
    let profiles = profiles();

    for a in &profiles {
        for b in &profiles {
            let ab = analyzer.analyze_keyword_combination(a, b);
            let ba = analyzer.analyze_keyword_combination(b, a);
            assert_eq!(ab, ba, "{} / {}", a.name, b.name);
        }
    }
}

#[test]
fn test_repeat_analysis_does_not_grow_cache() {
    let mut analyzer = create_keyword_analyzer(&AppConfig::default().keyword);
    let profiles = profiles();

    let first = analyzer.analyze_keyword_combination(&profiles[2], &profiles[3]);
    let size = analyzer.cache_size();
    let second = analyzer.analyze_keyword_combination(&profiles[2], &profiles[3]);

    assert_eq!(first, second);
    assert_eq!(analyzer.cache_size(), size);
    assert_eq!(
        analyzer.identify_main_conflicts(&first),
        vec!["relational_harmony"]
    );
}

#[test]
fn test_dominant_tension_for_reform_versus_peace() {
    let mut analyzer = KeywordConflictAnalyzer::default();
    let profiles = profiles();
    let map = analyzer.analyze_keyword_combination(&profiles[4], &profiles[2]);

    assert!(map.tension_summary().time);
    assert_eq!(analyzer.count_conflicts(&map), 1);
}
