//! CLI entry point for the time-series gap filler.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use knn_imputation::{
    BatchMetrics, FillOutcome, FillStrategy, ImputationReport, ImputationService, ImputerConfig,
    MetricSummary, ReportGenerator, ReportParams,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// CLI-compatible fill strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliFillStrategy {
    /// Interpolate interior gaps, KNN for the rest
    Hybrid,
    /// KNN for every gap
    KnnOnly,
}

impl From<CliFillStrategy> for FillStrategy {
    fn from(cli: CliFillStrategy) -> Self {
        match cli {
            CliFillStrategy::Hybrid => FillStrategy::Hybrid,
            CliFillStrategy::KnnOnly => FillStrategy::KnnOnly,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Time-series gap filling with interpolation and time-weighted KNN",
    long_about = "Fills missing numeric values in a time-indexed CSV.\n\n\
                  Interior gaps between two present values get their mean; all other gaps \
                  are estimated from the k nearest rows in time.\n\n\
                  EXAMPLES:\n  \
                  # Fill gaps, first column is the time axis\n  \
                  knn-imputation -i sensor.csv\n\n  \
                  # Score against a clean copy of the same data\n  \
                  knn-imputation -i sensor_gaps.csv --truth sensor_clean.csv\n\n  \
                  # Explicit time column and neighbor count\n  \
                  knn-imputation -i sensor.csv -t timestamp --neighbors 5"
)]
struct Args {
    /// Path to the CSV file to process
    #[arg(short, long)]
    input: String,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "<input_name>_imputed"
    #[arg(long)]
    output_name: Option<String>,

    /// Name of the time column (default: first column)
    #[arg(short, long)]
    time_column: Option<String>,

    /// Number of neighbors for KNN estimation
    #[arg(short, long = "neighbors", default_value = "3")]
    k: usize,

    /// Minimum number of rows required to score a batch
    #[arg(long, default_value = "10")]
    batch_size: usize,

    /// Strategy for filling missing values
    #[arg(long, value_enum, default_value = "hybrid")]
    strategy: CliFillStrategy,

    /// Clean CSV, row-aligned with the input, to score the fill against
    #[arg(long)]
    truth: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    if let Some(ref truth) = args.truth
        && !Path::new(truth).exists()
    {
        return Err(anyhow!("Ground truth file not found: {}", truth));
    }

    if !Path::new(&args.output).exists() {
        std::fs::create_dir_all(&args.output)?;
        info!("Created output directory: {}", args.output);
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let mut config_builder = ImputerConfig::builder()
        .k(args.k)
        .batch_size(args.batch_size)
        .strategy(args.strategy.into());
    if let Some(ref time_column) = args.time_column {
        config_builder = config_builder.time_column(time_column);
    }
    let service = ImputationService::new(config_builder.build()?)?;

    let run = match args.truth {
        Some(ref truth_path) => {
            let truth = load_csv_with_fallbacks(truth_path)?;
            run_scored(&service, &data, &truth)?
        }
        None => run_unscored(&service, &data)?,
    };

    handle_output(run, &service, &args)
}

/// Filled frame plus what goes into the report.
struct RunOutput {
    frame: DataFrame,
    outcome: FillOutcome,
    batch_metrics: Option<BatchMetrics>,
    summary: Option<MetricSummary>,
}

fn run_unscored(service: &ImputationService, data: &DataFrame) -> Result<RunOutput> {
    let imputed = service.impute_frame_detailed(data, None, None)?;
    Ok(RunOutput {
        frame: imputed.frame,
        outcome: imputed.outcome,
        batch_metrics: None,
        summary: None,
    })
}

/// Fill and score against ground truth; falls back to an unscored fill when
/// the input is below the batch size.
fn run_scored(
    service: &ImputationService,
    data: &DataFrame,
    truth: &DataFrame,
) -> Result<RunOutput> {
    match service.process_batch(data, Some(truth)) {
        Ok(result) => Ok(RunOutput {
            frame: result.frame,
            outcome: result.outcome.fill,
            batch_metrics: result.outcome.metrics,
            summary: result.outcome.summary,
        }),
        Err(e) if e.is_insufficient_data() => {
            warn!("{}; skipping metrics", e);
            run_unscored(service, data)
        }
        Err(e) => {
            error!("Imputation failed: {}", e);
            Err(anyhow!("Imputation failed: {}", e))
        }
    }
}

/// Handle output based on CLI flags.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_output(run: RunOutput, service: &ImputationService, args: &Args) -> Result<()> {
    let RunOutput {
        mut frame,
        outcome,
        batch_metrics,
        summary,
    } = run;

    let input_stem = extract_file_stem(&args.input);
    let output_name = args
        .output_name
        .clone()
        .unwrap_or_else(|| format!("{}_imputed", input_stem));

    let generator = ReportGenerator::new(PathBuf::from(&args.output));
    let output_path = generator.write_dataset(&mut frame, &output_name)?;
    let output_file = output_path.to_string_lossy().to_string();

    let report = ReportGenerator::build_report(ReportParams {
        input_file: &args.input,
        output_file: Some(&output_file),
        outcome: &outcome,
        batch_metrics: batch_metrics.as_ref(),
        summary: summary.as_ref(),
        config: service.config(),
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let report_path = generator.write_report_to_file(&report, &input_stem)?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report);

    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

/// Print a human-readable summary of the run.
fn print_human_readable_summary(report: &ImputationReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("IMPUTATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {} ({} rows)", report.input_file, report.rows);
    if let Some(ref output_file) = report.output_file {
        println!("Output: {}", output_file);
    }
    println!("Time column: {}", report.time_column);
    println!(
        "Strategy: {:?}, k = {}",
        report.config.strategy, report.config.k
    );
    println!();

    println!(
        "{:<24} {:>10} {:>14} {:>10}",
        "Column", "Missing", "Interpolated", "KNN"
    );
    println!("{}", "-".repeat(62));
    for column in &report.columns {
        println!(
            "{:<24} {:>10} {:>14} {:>10}",
            truncate_str(&column.column, 23),
            column.missing,
            column.interpolated,
            column.knn
        );
    }
    println!();
    println!("Filled {} cells", report.imputed_cells);

    if let Some(ref batch) = report.batch_metrics {
        println!();
        println!("Metrics:");
        println!("  MAPE (interpolation/KNN): {}", format_metric(batch.mape));
        println!("  MAPE (mean fill):         {}", format_metric(batch.mape_mean));
        println!("  Improvement:              {}", format_metric(batch.improvement));
        if batch.excluded_zero_truth > 0 {
            println!(
                "  ! {} cells excluded (zero ground truth)",
                batch.excluded_zero_truth
            );
        }
    }
    println!();

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Load CSV with multiple fallback strategies
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    // Strategy 1: Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Without quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading without quotes failed: {}", e);
        }
    }

    // Strategy 3: Pre-clean content
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cleaned = clean_csv_content(&content);
            let cursor = std::io::Cursor::new(cleaned);

            CsvReadOptions::default()
                .with_infer_schema_length(Some(100))
                .with_has_header(true)
                .into_reader_with_file_handle(cursor)
                .finish()
                .map_err(|e| e.into())
        }
        Err(e) => {
            error!("Could not read file: {}", e);
            Err(e.into())
        }
    }
}

/// Clean CSV content
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
