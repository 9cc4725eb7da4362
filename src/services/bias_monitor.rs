//! Selection bias monitor
//!
//! Rolling window of selection records with statistical checks for skewed
//! output. Findings are values plus `warn!` logs; nothing here fails except
//! record validation on insert.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::BiasConfig;
use crate::error::Result;
use crate::models::hexagram::HEXAGRAM_COUNT;
use crate::models::selection::SelectionRecord;
use crate::services::statistics::{self, ChiSquareResult, OutlierReport};

/// Monitor shared between threads
pub type SharedBiasMonitor = Arc<Mutex<SelectionBiasMonitor>>;

/// Wrap a new monitor for shared use
pub fn shared_monitor(config: BiasConfig) -> SharedBiasMonitor {
    Arc::new(Mutex::new(SelectionBiasMonitor::new(config)))
}

/// What `add_selection` did with a valid record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    Recorded,
    /// Exact repeat of the previous record
    DuplicateDropped,
}

/// Most frequent line id in the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineConcentration {
    pub line_id: Option<u16>,
    pub count: usize,
    pub share: f64,
    pub threshold: f64,
    pub flagged: bool,
}

/// A chi-square test that may have been skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareCheck {
    pub categories: usize,
    /// Observations fed to the test
    pub sample_size: usize,
    pub min_samples: usize,
    pub ran: bool,
    pub skip_reason: Option<String>,
    pub result: Option<ChiSquareResult>,
    pub alpha: f64,
    pub flagged: bool,
}

impl ChiSquareCheck {
    fn skipped(
        categories: usize,
        sample_size: usize,
        min_samples: usize,
        alpha: f64,
        reason: String,
    ) -> Self {
        Self {
            categories,
            sample_size,
            min_samples,
            ran: false,
            skip_reason: Some(reason),
            result: None,
            alpha,
            flagged: false,
        }
    }
}

/// Longest run of one line id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRun {
    pub line_id: Option<u16>,
    pub length: usize,
    pub cap: usize,
    pub flagged: bool,
}

/// Share of each regular position (sentinels excluded)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionShares {
    /// Counts for positions 1-6
    pub counts: [usize; 6],
    pub regular_count: usize,
    pub max_position: Option<u8>,
    pub max_share: f64,
    pub cap: f64,
    pub flagged: bool,
}

/// Combined share of the two oracle lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentinelShare {
    pub count: usize,
    pub share: f64,
    pub cap: f64,
    pub flagged: bool,
}

/// Full audit snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub generated_at: DateTime<Utc>,
    pub sample_size: usize,
    pub capacity: usize,
    pub min_samples: usize,
    /// False below `min_samples`; every check is then unflagged
    pub sufficient_data: bool,
    pub sentinel_count: usize,
    pub bias_detected: bool,
    pub line_concentration: LineConcentration,
    pub position_chi_square: ChiSquareCheck,
    pub hexagram_chi_square: ChiSquareCheck,
    pub consecutive_repeats: RepeatRun,
    pub position_shares: PositionShares,
    pub sentinel_share: SentinelShare,
    /// IQR fencing over per-line frequencies, ascending line id order
    pub frequency_outliers: OutlierReport,
    pub frequency_outlier_lines: Vec<u16>,
}

/// Rolling-window bias detector
#[derive(Debug)]
pub struct SelectionBiasMonitor {
    config: BiasConfig,
    records: VecDeque<SelectionRecord>,
    frequencies: HashMap<u16, usize>,
}

impl Default for SelectionBiasMonitor {
    fn default() -> Self {
        Self::new(BiasConfig::default())
    }
}

impl SelectionBiasMonitor {
    pub fn new(config: BiasConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            config: BiasConfig { capacity, ..config },
            records: VecDeque::with_capacity(capacity),
            frequencies: HashMap::new(),
        }
    }

    /// Default thresholds with a different window size
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(BiasConfig {
            capacity,
            ..BiasConfig::default()
        })
    }

    pub fn config(&self) -> &BiasConfig {
        &self.config
    }

    /// Validate and record one selection, evicting the oldest when full
    pub fn add_selection(&mut self, record: SelectionRecord) -> Result<SelectionOutcome> {
        record.validate()?;

        if self.records.back() == Some(&record) {
            warn!(
                line_id = record.line_id,
                hexagram_id = record.hexagram_id,
                timestamp = ?record.timestamp,
                "duplicate selection record dropped"
            );
            return Ok(SelectionOutcome::DuplicateDropped);
        }

        while self.records.len() >= self.config.capacity {
            let Some(evicted) = self.records.pop_front() else {
                break;
            };
            self.decrement(evicted.line_id);
        }

        *self.frequencies.entry(record.line_id).or_insert(0) += 1;
        self.records.push_back(record);
        Ok(SelectionOutcome::Recorded)
    }

    fn decrement(&mut self, line_id: u16) {
        if let Some(count) = self.frequencies.get_mut(&line_id) {
            *count -= 1;
            if *count == 0 {
                self.frequencies.remove(&line_id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.frequencies.clear();
    }

    /// Occurrences of a line id in the window
    pub fn frequency(&self, line_id: u16) -> usize {
        self.frequencies.get(&line_id).copied().unwrap_or(0)
    }

    pub fn records(&self) -> impl Iterator<Item = &SelectionRecord> {
        self.records.iter()
    }

    fn sufficient(&self) -> bool {
        self.records.len() >= self.config.min_samples
    }

    fn regular_records(&self) -> impl Iterator<Item = &SelectionRecord> {
        self.records.iter().filter(|r| !r.is_sentinel())
    }

    // ===== Individual checks =====

    pub fn line_concentration(&self) -> LineConcentration {
        let total = self.records.len();
        // lowest id wins ties
        let top = self
            .frequencies
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&id, &count)| (id, count));

        let (line_id, count) = match top {
            Some((id, count)) => (Some(id), count),
            None => (None, 0),
        };
        let share = if total == 0 { 0.0 } else { count as f64 / total as f64 };

        LineConcentration {
            line_id,
            count,
            share,
            threshold: self.config.line_share_threshold,
            flagged: self.sufficient() && share > self.config.line_share_threshold,
        }
    }

    pub fn detect_line_concentration(&self) -> bool {
        self.line_concentration().flagged
    }

    /// Position goodness-of-fit over regular records
    pub fn position_chi_square(&self) -> ChiSquareCheck {
        let counts = self.position_counts();
        let n: usize = counts.iter().sum();
        self.chi_square_check(&counts, n, self.config.position_chi_min_samples)
    }

    /// Hexagram goodness-of-fit over every record
    pub fn hexagram_chi_square(&self) -> ChiSquareCheck {
        let mut counts = [0usize; HEXAGRAM_COUNT];
        for record in &self.records {
            counts[record.hexagram_id as usize - 1] += 1;
        }
        self.chi_square_check(&counts, self.records.len(), self.config.hexagram_chi_min_samples)
    }

    fn chi_square_check(&self, counts: &[usize], n: usize, min_samples: usize) -> ChiSquareCheck {
        let categories = counts.len();
        let alpha = self.config.alpha;

        if !self.sufficient() {
            return ChiSquareCheck::skipped(
                categories,
                n,
                min_samples,
                alpha,
                format!("window below {} records", self.config.min_samples),
            );
        }
        if n < min_samples {
            return ChiSquareCheck::skipped(
                categories,
                n,
                min_samples,
                alpha,
                format!("{n} observations, {min_samples} required"),
            );
        }
        let expected = n as f64 / categories as f64;
        if expected < self.config.min_expected_count {
            return ChiSquareCheck::skipped(
                categories,
                n,
                min_samples,
                alpha,
                format!("expected count {expected:.2} below {}", self.config.min_expected_count),
            );
        }

        let result = statistics::chi_square_uniform(counts);
        let flagged = result.as_ref().is_some_and(|r| r.is_significant(alpha));
        ChiSquareCheck {
            categories,
            sample_size: n,
            min_samples,
            ran: result.is_some(),
            skip_reason: None,
            result,
            alpha,
            flagged,
        }
    }

    pub fn consecutive_repeats(&self) -> RepeatRun {
        let run = statistics::longest_run(self.records.iter().map(|r| r.line_id));
        let (line_id, length) = match run {
            Some((id, len)) => (Some(id), len),
            None => (None, 0),
        };
        RepeatRun {
            line_id,
            length,
            cap: self.config.max_consecutive_repeats,
            flagged: self.sufficient() && length > self.config.max_consecutive_repeats,
        }
    }

    pub fn detect_consecutive_repeats(&self) -> bool {
        self.consecutive_repeats().flagged
    }

    fn position_counts(&self) -> [usize; 6] {
        let mut counts = [0usize; 6];
        for record in self.regular_records() {
            counts[record.position as usize - 1] += 1;
        }
        counts
    }

    pub fn position_shares(&self) -> PositionShares {
        let counts = self.position_counts();
        let regular_count: usize = counts.iter().sum();

        let (max_position, max_share) = if regular_count == 0 {
            (None, 0.0)
        } else {
            let (idx, &max) = counts
                .iter()
                .enumerate()
                .rev()
                .max_by_key(|&(_, c)| *c)
                .unwrap_or((0, &0));
            (Some(idx as u8 + 1), max as f64 / regular_count as f64)
        };

        PositionShares {
            counts,
            regular_count,
            max_position,
            max_share,
            cap: self.config.position_share_cap,
            flagged: self.sufficient() && max_share > self.config.position_share_cap,
        }
    }

    pub fn detect_position_bias(&self) -> bool {
        self.position_shares().flagged
    }

    pub fn sentinel_share(&self) -> SentinelShare {
        let total = self.records.len();
        let count = total - self.regular_records().count();
        let share = if total == 0 { 0.0 } else { count as f64 / total as f64 };
        SentinelShare {
            count,
            share,
            cap: self.config.sentinel_share_cap,
            flagged: self.sufficient() && share > self.config.sentinel_share_cap,
        }
    }

    /// Oracle lines (用九 / 用六) over-represented
    pub fn detect_special_line_bias(&self) -> bool {
        self.sentinel_share().flagged
    }

    /// IQR fencing over arbitrary values
    pub fn detect_outliers(&self, values: &[f64]) -> OutlierReport {
        statistics::detect_outliers(values)
    }

    // ===== Aggregate =====

    /// Any check flagged; false below `min_samples`
    ///
    /// Cheap enough to poll per insert. Findings are logged by `report` only.
    pub fn detect_bias(&self) -> bool {
        self.sufficient()
            && (self.detect_line_concentration()
                || self.position_chi_square().flagged
                || self.hexagram_chi_square().flagged
                || self.detect_consecutive_repeats()
                || self.detect_position_bias()
                || self.detect_special_line_bias())
    }

    /// Run every check and bundle the results
    pub fn report(&self) -> BiasReport {
        let sufficient_data = self.sufficient();

        let line_concentration = self.line_concentration();
        let position_chi_square = self.position_chi_square();
        let hexagram_chi_square = self.hexagram_chi_square();
        let consecutive_repeats = self.consecutive_repeats();
        let position_shares = self.position_shares();
        let sentinel_share = self.sentinel_share();

        let sorted: BTreeMap<u16, usize> = self.frequencies.iter().map(|(&k, &v)| (k, v)).collect();
        let line_ids: Vec<u16> = sorted.keys().copied().collect();
        let values: Vec<f64> = sorted.values().map(|&v| v as f64).collect();
        let frequency_outliers = statistics::detect_outliers(&values);
        let frequency_outlier_lines = frequency_outliers
            .outlier_indices
            .iter()
            .map(|&i| line_ids[i])
            .collect();

        let bias_detected = line_concentration.flagged
            || position_chi_square.flagged
            || hexagram_chi_square.flagged
            || consecutive_repeats.flagged
            || position_shares.flagged
            || sentinel_share.flagged;

        let report = BiasReport {
            generated_at: Utc::now(),
            sample_size: self.records.len(),
            capacity: self.config.capacity,
            min_samples: self.config.min_samples,
            sufficient_data,
            sentinel_count: sentinel_share.count,
            bias_detected,
            line_concentration,
            position_chi_square,
            hexagram_chi_square,
            consecutive_repeats,
            position_shares,
            sentinel_share,
            frequency_outliers,
            frequency_outlier_lines,
        };

        if !sufficient_data {
            debug!(
                sample_size = report.sample_size,
                min_samples = report.min_samples,
                "bias checks skipped"
            );
        }
        log_findings(&report);
        report
    }
}

fn log_findings(report: &BiasReport) {
    if report.line_concentration.flagged {
        warn!(
            line_id = ?report.line_concentration.line_id,
            share = report.line_concentration.share,
            "line id over-represented"
        );
    }
    for (name, check) in [
        ("position", &report.position_chi_square),
        ("hexagram", &report.hexagram_chi_square),
    ] {
        if let Some(result) = check.result.as_ref().filter(|_| check.flagged) {
            warn!(
                test = name,
                statistic = result.statistic,
                p_value = result.p_value,
                "chi-square rejects uniformity"
            );
        }
    }
    if report.consecutive_repeats.flagged {
        warn!(
            line_id = ?report.consecutive_repeats.line_id,
            length = report.consecutive_repeats.length,
            "consecutive repeat run"
        );
    }
    if report.position_shares.flagged {
        warn!(
            position = ?report.position_shares.max_position,
            share = report.position_shares.max_share,
            "position over-represented"
        );
    }
    if report.sentinel_share.flagged {
        warn!(
            count = report.sentinel_share.count,
            share = report.sentinel_share.share,
            "oracle lines over-represented"
        );
    }
}
