use crate::config::ImputerConfig;
use crate::engine::FillOutcome;
use crate::error::Result;
use crate::metrics::{BatchMetrics, MetricSummary};
use crate::types::ColumnFillSummary;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Report Types
// ============================================================================

/// Report of one imputation run, for CLI and library output.
///
/// Use this for both JSON output (`--json`) and file writing (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationReport {
    // Metadata
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the output file (if written)
    pub output_file: Option<String>,

    // Shape
    pub rows: usize,
    pub time_column: String,
    /// Missing cells filled across all columns
    pub imputed_cells: usize,

    /// Per-column fill counts by method
    pub columns: Vec<ColumnFillSummary>,

    // Metrics (only when ground truth was supplied)
    pub batch_metrics: Option<BatchMetrics>,
    pub summary: Option<MetricSummary>,

    /// Configuration the run used
    pub config: ImputerConfig,
}

/// Everything needed to build an [`ImputationReport`].
pub struct ReportParams<'a> {
    pub input_file: &'a str,
    pub output_file: Option<&'a str>,
    pub outcome: &'a FillOutcome,
    pub batch_metrics: Option<&'a BatchMetrics>,
    pub summary: Option<&'a MetricSummary>,
    pub config: &'a ImputerConfig,
}

// ============================================================================
// Report Generator
// ============================================================================

/// Writes imputed datasets and JSON reports into an output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Build a report from the outcome of a run.
    pub fn build_report(params: ReportParams<'_>) -> ImputationReport {
        let ReportParams {
            input_file,
            output_file,
            outcome,
            batch_metrics,
            summary,
            config,
        } = params;

        ImputationReport {
            generated_at: Local::now().to_rfc3339(),
            input_file: input_file.to_string(),
            output_file: output_file.map(str::to_string),
            rows: outcome.table.height(),
            time_column: outcome.table.time_name().to_string(),
            imputed_cells: outcome.imputed_count(),
            columns: outcome.column_summaries(),
            batch_metrics: batch_metrics.cloned(),
            summary: summary.copied(),
            config: config.clone(),
        }
    }

    /// Write the imputed dataset as `<file_name>.csv`.
    pub fn write_dataset(&self, df: &mut DataFrame, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_dir.join(format!("{}.csv", file_name));
        let mut file = File::create(&output_path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)?;

        info!("Dataset saved: {}", output_path.display());
        Ok(output_path)
    }

    /// Write the report as pretty JSON to `<report_base_name>_report.json`.
    pub fn write_report_to_file(
        &self,
        report: &ImputationReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
