//! Imputation service.
//!
//! [`ImputationService`] is the entry point an outer layer (HTTP handler,
//! CLI) talks to. It works on polars frames, owns the engine configuration and
//! keeps the batch metric history across calls.
//!
//! # Thread Safety
//!
//! Every method takes `&self`. The metric history sits behind a
//! `parking_lot::Mutex`; a batch is filled and scored outside the lock and its
//! MAPEs are appended in a single critical section.

use crate::config::{ConfigValidationError, ImputerConfig};
use crate::engine::{BatchFillEngine, BatchOutcome, FillOutcome, log_batch_metrics};
use crate::error::Result;
use crate::frame::FrameTable;
use crate::metrics::{MetricAccumulator, MetricSummary};
use parking_lot::Mutex;
use polars::prelude::DataFrame;
use tracing::{debug, info};

/// Frame-level result of a batch pass.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Filled frame, rows in time order
    pub frame: DataFrame,
    pub outcome: BatchOutcome,
}

/// Frame-level result of an ungated fill.
#[derive(Debug, Clone)]
pub struct ImputedFrame {
    /// Filled frame, rows in time order
    pub frame: DataFrame,
    pub outcome: FillOutcome,
}

pub struct ImputationService {
    config: ImputerConfig,
    engine: BatchFillEngine,
    metrics: Mutex<MetricAccumulator>,
}

// Shared between request handlers
static_assertions::assert_impl_all!(ImputationService: Send, Sync);

impl Default for ImputationService {
    fn default() -> Self {
        let config = ImputerConfig::default();
        Self {
            engine: BatchFillEngine::new(&config),
            config,
            metrics: Mutex::new(MetricAccumulator::new()),
        }
    }
}

impl ImputationService {
    /// Create a service from a validated configuration.
    pub fn new(config: ImputerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: BatchFillEngine::new(&config),
            config,
            metrics: Mutex::new(MetricAccumulator::new()),
        })
    }

    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    /// Fill every missing numeric cell of `df`.
    ///
    /// No row-count gate and no metrics. `time_column` falls back to the
    /// configured one, then to the first column; `k` falls back to the
    /// configured one. The returned frame is sorted by time.
    pub fn impute_frame(
        &self,
        df: &DataFrame,
        time_column: Option<&str>,
        k: Option<usize>,
    ) -> Result<DataFrame> {
        Ok(self.impute_frame_detailed(df, time_column, k)?.frame)
    }

    /// Like [`Self::impute_frame`], also returning which cells were filled and how.
    pub fn impute_frame_detailed(
        &self,
        df: &DataFrame,
        time_column: Option<&str>,
        k: Option<usize>,
    ) -> Result<ImputedFrame> {
        let engine = self.engine_for(k)?;
        let framed = FrameTable::from_frame(df, self.time_column(time_column))?;

        let outcome = engine.fill_table(framed.table())?;
        let frame = framed.to_frame(&outcome.table)?;
        Ok(ImputedFrame { frame, outcome })
    }

    /// Gated batch pass over `df` with the configured time column and `k`.
    ///
    /// `truth` must be row-aligned with `df` (same input order). When it is
    /// given, the batch MAPEs are appended to the service's history and the
    /// accumulated summary is returned in the outcome.
    ///
    /// # Errors
    ///
    /// [`crate::ImputeError::InsufficientData`] when `df` has fewer rows than
    /// the batch size; nothing is filled or recorded in that case.
    pub fn process_batch(&self, df: &DataFrame, truth: Option<&DataFrame>) -> Result<BatchResult> {
        self.run_batch(&self.engine, df, truth, None)
    }

    /// Score a frame with gaps against its clean counterpart.
    ///
    /// The metric history is reset first, so the result covers this call
    /// only.
    pub fn calculate_metrics(
        &self,
        df_with_gaps: &DataFrame,
        df_clean: &DataFrame,
        time_column: Option<&str>,
        k: Option<usize>,
    ) -> Result<MetricSummary> {
        self.reset_metrics();

        let engine = self.engine_for(k)?;
        let result = self.run_batch(&engine, df_with_gaps, Some(df_clean), time_column)?;
        Ok(result.outcome.summary.unwrap_or_default())
    }

    /// Summary over every batch recorded so far.
    pub fn summary(&self) -> MetricSummary {
        self.metrics.lock().summary()
    }

    /// Snapshot of the recorded batch MAPEs.
    pub fn metric_history(&self) -> MetricAccumulator {
        self.metrics.lock().clone()
    }

    pub fn reset_metrics(&self) {
        self.metrics.lock().reset();
        debug!("Metric history cleared");
    }

    fn run_batch(
        &self,
        engine: &BatchFillEngine,
        df: &DataFrame,
        truth: Option<&DataFrame>,
        time_column: Option<&str>,
    ) -> Result<BatchResult> {
        let framed = FrameTable::from_frame(df, self.time_column(time_column))?;
        engine.check_batch_size(framed.table())?;

        let Some(truth) = truth else {
            let fill = engine.fill_table(framed.table())?;
            let frame = framed.to_frame(&fill.table)?;
            return Ok(BatchResult {
                frame,
                outcome: BatchOutcome {
                    fill,
                    metrics: None,
                    summary: None,
                },
            });
        };

        let truth = framed.align_truth(truth)?;
        let (fill, metrics) = engine.fill_with_metrics(framed.table(), &truth)?;

        let summary = {
            let mut history = self.metrics.lock();
            history.record(&metrics);
            history.summary()
        };
        log_batch_metrics(&metrics, &summary);

        let frame = framed.to_frame(&fill.table)?;
        info!("Batch of {} rows processed", frame.height());
        Ok(BatchResult {
            frame,
            outcome: BatchOutcome {
                fill,
                metrics: Some(metrics),
                summary: Some(summary),
            },
        })
    }

    fn engine_for(&self, k: Option<usize>) -> Result<BatchFillEngine> {
        match k {
            None => Ok(self.engine.clone()),
            Some(0) => Err(ConfigValidationError::InvalidNeighbors(0).into()),
            Some(k) => Ok(self.engine.with_k(k)),
        }
    }

    fn time_column<'a>(&'a self, explicit: Option<&'a str>) -> Option<&'a str> {
        explicit.or(self.config.time_column.as_deref())
    }
}
