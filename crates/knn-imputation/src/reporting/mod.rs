//! Report generation module.
//!
//! Builds the serializable [`ImputationReport`] of a run and writes the
//! imputed dataset and the report into an output directory.
//!
//! The same report is used for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use knn_imputation::reporting::{ReportGenerator, ReportParams};
//!
//! let report = ReportGenerator::build_report(ReportParams {
//!     input_file: "data/sensor.csv",
//!     output_file: Some("output/sensor_imputed.csv"),
//!     outcome: &imputed.outcome,
//!     batch_metrics: None,
//!     summary: None,
//!     config: service.config(),
//! });
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"));
//! generator.write_report_to_file(&report, "sensor")?;
//! ```

mod generator;

pub use generator::{ImputationReport, ReportGenerator, ReportParams};
