//! hexagram-audit - offline selection bias audit
//!
//! Checks the hexagram table, replays a JSON-lines stream of selection
//! records through a bias monitor and prints the report as JSON.

use anyhow::Context;
use clap::Parser;
use hexagram_engine::config::ConfigLoader;
use hexagram_engine::error::{EngineError, ErrorRecord};
use hexagram_engine::models::SelectionRecord;
use hexagram_engine::observability::{EngineMetrics, MetricsSnapshot, init_tracing};
use hexagram_engine::services::{
    BiasReport, CompletenessReport, SelectionOutcome, TrigramHexagramMatrix, create_bias_monitor,
};
use serde::Serialize;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Hexagram audit CLI
#[derive(Parser)]
#[command(name = "hexagram-audit")]
#[command(about = "Audit a stream of hexagram selections for statistical bias", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HEXAGRAM_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-lines selection records; stdin when omitted or "-"
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Override the monitor window size
    #[arg(long)]
    capacity: Option<usize>,

    /// Override the log filter
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,

    /// Exit with status 1 when bias is detected
    #[arg(long)]
    fail_on_bias: bool,

    /// Print counters in Prometheus text format to stderr
    #[arg(long)]
    metrics: bool,
}

/// Audit output document
#[derive(Serialize)]
struct AuditOutput {
    table: CompletenessReport,
    report: BiasReport,
    rejected: Vec<ErrorRecord>,
    metrics: MetricsSnapshot,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load().context("loading configuration")?,
    };
    if let Some(capacity) = cli.capacity {
        config.bias.capacity = capacity;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json {
        config.logging.structured = true;
    }
    ConfigLoader::validate(&config)?;

    let _guard = init_tracing("hexagram-audit", &config.logging)?;
    info!(capacity = config.bias.capacity, "configuration loaded");

    let matrix = TrigramHexagramMatrix::new();
    let table = matrix.validate_completeness();
    if !table.complete {
        error!(
            missing = ?table.missing_ids,
            duplicates = ?table.duplicate_ids,
            diagonal = ?table.diagonal_mismatches,
            "hexagram table incomplete"
        );
        return Ok(ExitCode::from(2));
    }
    info!("hexagram table verified");

    let reader: Box<dyn BufRead> = match cli.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        _ => Box::new(BufReader::new(std::io::stdin())),
    };

    let metrics = EngineMetrics::default();
    let mut monitor = create_bias_monitor(&config.bias);
    let mut rejected = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("reading input line {number}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let outcome = serde_json::from_str::<SelectionRecord>(&line)
            .map_err(EngineError::from)
            .and_then(|record| monitor.add_selection(record));

        match outcome {
            Ok(SelectionOutcome::Recorded) => metrics.record_selection(),
            Ok(SelectionOutcome::DuplicateDropped) => metrics.record_duplicate(),
            Err(e) => {
                warn!(line = number, error = %e, "selection rejected");
                metrics.record_rejection();
                rejected.push(ErrorRecord::new(&e).with_line(number));
            }
        }
    }

    if monitor.is_empty() {
        warn!("no selection records read");
    }

    let report = monitor.report();
    metrics.record_bias_check(report.bias_detected);
    info!(
        samples = report.sample_size,
        rejected = rejected.len(),
        bias = report.bias_detected,
        "audit complete"
    );

    if cli.metrics {
        eprint!("{}", metrics.gather());
    }

    let bias_detected = report.bias_detected;
    let output = AuditOutput {
        table,
        report,
        rejected,
        metrics: metrics.snapshot(),
    };
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    if cli.fail_on_bias && bias_detected {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
