//! Time-Series Gap Filling Library
//!
//! Fills missing numeric values in time-indexed tables with a hybrid of
//! neighbor interpolation and time-weighted K-nearest-neighbor estimation,
//! and scores the result against a mean-fill baseline when ground truth is
//! available. Built with Rust and Polars.
//!
//! # Overview
//!
//! - **Hybrid fill**: interior gaps between two present values get their
//!   mean; every other gap falls back to KNN over the time axis
//! - **Time-weighted KNN**: neighbors weighted by `1 / (|Δt| + ε)`
//! - **Sequential filling**: earlier fills in a column are visible to later ones
//! - **Metrics**: MAPE of the fill vs. MAPE of a mean fill, accumulated across
//!   batches, plus their ratio
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use knn_imputation::{ImputationService, ImputerConfig};
//! use polars::prelude::*;
//!
//! let service = ImputationService::new(
//!     ImputerConfig::builder().k(3).batch_size(10).build()?,
//! )?;
//!
//! // Fill a frame (first column is the time axis)
//! let filled = service.impute_frame(&df, None, None)?;
//!
//! // Score against a clean copy
//! let metrics = service.calculate_metrics(&df, &clean, None, None)?;
//! println!("{:?}", metrics.to_map());
//! ```
//!
//! # Working without polars
//!
//! The engine itself runs on [`TimeTable`]:
//!
//! ```rust,ignore
//! use knn_imputation::{BatchFillEngine, Column, ImputerConfig, TimeTable};
//!
//! let table = TimeTable::new(
//!     "DateTime",
//!     vec![0, 3_600_000, 7_200_000],
//!     vec![Column::new("temp", vec![Some(1.0), None, Some(3.0)])],
//! )?;
//! let outcome = BatchFillEngine::new(&ImputerConfig::default()).fill_table(&table)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod imputers;
pub mod metrics;
pub mod reporting;
pub mod service;
pub mod table;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, DEFAULT_BATCH_SIZE, DEFAULT_EPSILON, DEFAULT_K, FillStrategy,
    ImputerConfig, ImputerConfigBuilder,
};
pub use engine::{BatchFillEngine, BatchOutcome, ColumnFill, FillOutcome};
pub use error::{ImputeError, Result as ImputeResult, ResultExt};
pub use frame::FrameTable;
pub use imputers::{MeanFillImputer, TimeKnnImputer};
pub use metrics::{BatchMetrics, ErrorPool, MetricAccumulator, MetricSummary};
pub use reporting::{ImputationReport, ReportGenerator, ReportParams};
pub use service::{BatchResult, ImputationService, ImputedFrame};
pub use table::{Column, TimeTable};
pub use types::{ColumnFillSummary, FillMethod, ImputedCell};
pub use utils::{is_datetime_dtype, is_numeric_dtype, parse_timestamp_ms};
