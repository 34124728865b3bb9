//! Batch fill engine.
//!
//! Drives the per-column, per-row fill sequence over a [`TimeTable`]:
//!
//! 1. Rows are visited in ascending time order (the table must already be
//!    sorted).
//! 2. A missing interior cell whose immediate neighbors are both present is
//!    filled with their mean.
//! 3. Any other missing cell is filled by the time-weighted KNN imputer,
//!    run against the column as it stands at that moment.
//! 4. Each estimate is written into the working copy before the next row is
//!    looked at, so later rows see earlier fills.
//!
//! Columns never read each other. When ground truth is supplied the engine
//! also scores its estimates and a mean-fill baseline against it.

use crate::config::{FillStrategy, ImputerConfig};
use crate::error::{ImputeError, Result, ResultExt};
use crate::imputers::{MeanFillImputer, TimeKnnImputer};
use crate::metrics::{BatchMetrics, ErrorPool, MetricAccumulator, MetricSummary};
use crate::table::{Column, TimeTable};
use crate::types::{ColumnFillSummary, FillMethod, ImputedCell};
use tracing::{debug, info};

/// Result of filling one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFill {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub cells: Vec<ImputedCell>,
}

impl ColumnFill {
    pub fn summary(&self) -> ColumnFillSummary {
        ColumnFillSummary::from_cells(&self.name, self.values.len(), &self.cells)
    }
}

/// A fully imputed table and the cells that were filled in each column.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub table: TimeTable,
    pub cells: Vec<(String, Vec<ImputedCell>)>,
}

impl FillOutcome {
    pub fn column_summaries(&self) -> Vec<ColumnFillSummary> {
        self.cells
            .iter()
            .map(|(name, cells)| ColumnFillSummary::from_cells(name, self.table.height(), cells))
            .collect()
    }

    pub fn imputed_count(&self) -> usize {
        self.cells.iter().map(|(_, cells)| cells.len()).sum()
    }
}

/// Outcome of a gated batch pass.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub fill: FillOutcome,
    /// Metrics of this batch, when ground truth was supplied
    pub metrics: Option<BatchMetrics>,
    /// Accumulated metrics over every recorded batch, after this one
    pub summary: Option<MetricSummary>,
}

/// Fills missing cells column by column.
#[derive(Debug, Clone)]
pub struct BatchFillEngine {
    knn: TimeKnnImputer,
    strategy: FillStrategy,
    batch_size: usize,
}

impl BatchFillEngine {
    pub fn new(config: &ImputerConfig) -> Self {
        Self {
            knn: TimeKnnImputer::new(config.k).with_epsilon(config.epsilon),
            strategy: config.strategy,
            batch_size: config.batch_size,
        }
    }

    /// Same engine with a different neighbor count.
    pub fn with_k(&self, k: usize) -> Self {
        Self {
            knn: TimeKnnImputer::new(k).with_epsilon(self.knn.epsilon()),
            ..self.clone()
        }
    }

    pub fn knn(&self) -> &TimeKnnImputer {
        &self.knn
    }

    pub fn strategy(&self) -> FillStrategy {
        self.strategy
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fill every missing cell of one column.
    ///
    /// # Errors
    ///
    /// [`ImputeError::EmptyNeighborhood`] when a cell needs the KNN fallback and
    /// the column has no present value. Nothing is returned for the column in
    /// that case.
    pub fn fill_column(&self, column: &Column, timestamps: &[i64]) -> Result<ColumnFill> {
        if column.len() != timestamps.len() {
            return Err(ImputeError::LengthMismatch {
                expected: timestamps.len(),
                actual: column.len(),
            });
        }

        let mut working = column.values.clone();

        let cells = match self.strategy {
            FillStrategy::KnnOnly => self.knn.impute_column(&column.name, &mut working, timestamps)?,
            FillStrategy::Hybrid => self.fill_hybrid(&column.name, &mut working, timestamps)?,
        };

        debug!(
            "Column '{}': {} cells filled ({} interpolated)",
            column.name,
            cells.len(),
            cells
                .iter()
                .filter(|c| c.method == FillMethod::Interpolation)
                .count()
        );

        Ok(ColumnFill {
            name: column.name.clone(),
            values: working,
            cells,
        })
    }

    fn fill_hybrid(
        &self,
        column: &str,
        working: &mut [Option<f64>],
        timestamps: &[i64],
    ) -> Result<Vec<ImputedCell>> {
        let mut cells = Vec::new();
        let n_rows = working.len();

        for row in 0..n_rows {
            if working[row].is_some() {
                continue;
            }

            let interpolated = if row > 0 && row + 1 < n_rows {
                match (working[row - 1], working[row + 1]) {
                    (Some(prev), Some(next)) => Some((prev + next) / 2.0),
                    _ => None,
                }
            } else {
                None
            };

            let (value, method) = match interpolated {
                Some(value) => (value, FillMethod::Interpolation),
                None => (
                    self.knn.estimate(column, working, timestamps, row)?,
                    FillMethod::Knn,
                ),
            };

            debug!(
                "{}: column '{}', row {}, value {:.4}",
                method.display_name(),
                column,
                row,
                value
            );

            working[row] = Some(value);
            cells.push(ImputedCell { row, value, method });
        }

        Ok(cells)
    }

    /// Fill every column of the table. No row-count gate, no metrics.
    pub fn fill_table(&self, table: &TimeTable) -> Result<FillOutcome> {
        let mut columns = Vec::with_capacity(table.width());
        let mut cells = Vec::with_capacity(table.width());

        for column in table.columns() {
            let filled = self
                .fill_column(column, table.timestamps())
                .context(format!("Filling column '{}'", column.name))?;
            cells.push((filled.name.clone(), filled.cells));
            columns.push(Column::new(filled.name, filled.values));
        }

        let outcome = FillOutcome {
            table: table.with_columns(columns)?,
            cells,
        };
        info!(
            "Filled {} missing cells across {} columns ({} rows)",
            outcome.imputed_count(),
            table.width(),
            table.height()
        );
        Ok(outcome)
    }

    /// Fill the table and score the fills against `truth`.
    ///
    /// `truth` must have the same row count and every data column of `table`,
    /// row-aligned. Per-cell errors of all columns are pooled into a single
    /// batch MAPE per method.
    pub fn fill_with_metrics(
        &self,
        table: &TimeTable,
        truth: &TimeTable,
    ) -> Result<(FillOutcome, BatchMetrics)> {
        if truth.height() != table.height() {
            return Err(ImputeError::LengthMismatch {
                expected: table.height(),
                actual: truth.height(),
            });
        }

        let outcome = self.fill_table(table)?;
        let mut pool = ErrorPool::new();

        for (column, (name, cells)) in table.columns().iter().zip(&outcome.cells) {
            let truth_column = truth
                .column(name)
                .ok_or_else(|| ImputeError::ColumnNotFound(name.clone()))
                .context("Aligning ground truth")?;
            let baseline = MeanFillImputer::fill(&column.values);

            for cell in cells {
                let actual = truth_column.values[cell.row].ok_or_else(|| {
                    ImputeError::InvalidGroundTruth {
                        column: name.clone(),
                        row: cell.row,
                    }
                })?;
                if let Some(mean_fill) = baseline[cell.row] {
                    pool.record(actual, cell.value, mean_fill);
                }
            }
        }

        let metrics = pool.batch_metrics();
        debug!(
            "Batch scored on {} of {} imputed cells ({} excluded: zero ground truth)",
            metrics.scored_cells, metrics.imputed_cells, metrics.excluded_zero_truth
        );
        Ok((outcome, metrics))
    }

    /// Reject tables shorter than the configured batch size.
    pub fn check_batch_size(&self, table: &TimeTable) -> Result<()> {
        if table.height() < self.batch_size {
            return Err(ImputeError::InsufficientData {
                rows: table.height(),
                required: self.batch_size,
            });
        }
        Ok(())
    }

    /// Gated batch pass.
    ///
    /// Refuses tables below the batch size without filling anything. With
    /// ground truth, the batch's MAPEs are appended to `accumulator` and the
    /// accumulated summary is returned alongside.
    pub fn process_batch(
        &self,
        table: &TimeTable,
        truth: Option<&TimeTable>,
        accumulator: &mut MetricAccumulator,
    ) -> Result<BatchOutcome> {
        self.check_batch_size(table)?;

        let Some(truth) = truth else {
            return Ok(BatchOutcome {
                fill: self.fill_table(table)?,
                metrics: None,
                summary: None,
            });
        };

        let (fill, metrics) = self.fill_with_metrics(table, truth)?;
        accumulator.record(&metrics);
        let summary = accumulator.summary();
        log_batch_metrics(&metrics, &summary);

        Ok(BatchOutcome {
            fill,
            metrics: Some(metrics),
            summary: Some(summary),
        })
    }
}

pub(crate) fn log_batch_metrics(batch: &BatchMetrics, summary: &MetricSummary) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
    info!(
        "Batch MAPE (interpolation/KNN): {}, MAPE (mean fill): {}",
        fmt(batch.mape),
        fmt(batch.mape_mean)
    );
    info!(
        "Overall MAPE: {}, mean fill: {}, improvement: {}",
        fmt(summary.mape),
        fmt(summary.mape_mean),
        fmt(summary.improvement)
    );
}
