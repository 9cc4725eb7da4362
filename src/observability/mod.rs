//! Observability module
//!
//! Structured logging setup and lightweight engine counters.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::error::{EngineError, Result};

// ===== Engine Counters =====

/// Engine event counters
#[derive(Clone, Default)]
pub struct EngineMetrics {
    pub selections_recorded: Arc<AtomicU64>,
    pub selections_rejected: Arc<AtomicU64>,
    pub duplicates_dropped: Arc<AtomicU64>,
    pub bias_checks: Arc<AtomicU64>,
    pub bias_flags: Arc<AtomicU64>,
}

impl EngineMetrics {
    pub fn record_selection(&self) {
        self.selections_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.selections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one bias evaluation and its outcome
    pub fn record_bias_check(&self, flagged: bool) {
        self.bias_checks.fetch_add(1, Ordering::Relaxed);
        if flagged {
            self.bias_flags.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            selections_recorded: self.selections_recorded.load(Ordering::Relaxed),
            selections_rejected: self.selections_rejected.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            bias_checks: self.bias_checks.load(Ordering::Relaxed),
            bias_flags: self.bias_flags.load(Ordering::Relaxed),
        }
    }

    /// Prometheus text format
    pub fn gather(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP selections_recorded_total Selection records accepted
# TYPE selections_recorded_total counter
selections_recorded_total {}
# HELP selections_rejected_total Selection records rejected by validation
# TYPE selections_rejected_total counter
selections_rejected_total {}
# HELP duplicates_dropped_total Consecutive duplicate records dropped
# TYPE duplicates_dropped_total counter
duplicates_dropped_total {}
# HELP bias_checks_total Bias evaluations run
# TYPE bias_checks_total counter
bias_checks_total {}
# HELP bias_flags_total Bias evaluations that flagged skew
# TYPE bias_flags_total counter
bias_flags_total {}
"#,
            s.selections_recorded,
            s.selections_rejected,
            s.duplicates_dropped,
            s.bias_checks,
            s.bias_flags,
        )
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub selections_recorded: u64,
    pub selections_rejected: u64,
    pub duplicates_dropped: u64,
    pub bias_checks: u64,
    pub bias_flags: u64,
}

// ===== Structured Logging =====

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` overrides `config.level`. When `log_dir` is set, output also
/// goes to a daily rolling file; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EngineError::Config(e.to_string()))?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, format!("{service_name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let (json_layer, text_layer) = if config.structured {
        (
            Some(fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            ),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EngineError::Config(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_gather() {
        let metrics = EngineMetrics::default();
        metrics.record_selection();
        metrics.record_selection();
        metrics.record_duplicate();
        metrics.record_bias_check(true);
        metrics.record_bias_check(false);

        let output = metrics.gather();
        assert!(output.contains("selections_recorded_total 2"));
        assert!(output.contains("duplicates_dropped_total 1"));
        assert!(output.contains("bias_checks_total 2"));
        assert!(output.contains("bias_flags_total 1"));
    }

    #[test]
    fn test_metrics_shared_between_clones() {
        let metrics = EngineMetrics::default();
        let clone = metrics.clone();
        clone.record_rejection();

        assert_eq!(metrics.snapshot().selections_rejected, 1);
    }
}
