//! Imputation quality metrics.
//!
//! For every imputed cell two absolute percentage errors are computed against
//! the aligned ground-truth value: one for the engine's estimate and one for
//! the mean-fill baseline. Cells whose ground truth is exactly zero are left
//! out of both samples, so a dataset with many true zeros is scored on fewer
//! cells than were imputed; [`BatchMetrics::excluded_zero_truth`] reports how
//! many.
//!
//! Batch MAPEs accumulate in a [`MetricAccumulator`], whose
//! [`MetricSummary`] serializes to `{"MAPE", "MAPE_mean", "improvement"}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `|truth - estimate| / truth`, or `None` when `truth` is zero.
pub fn absolute_percentage_error(truth: f64, estimate: f64) -> Option<f64> {
    if truth == 0.0 {
        return None;
    }
    Some(((truth - estimate) / truth).abs())
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Baseline MAPE divided by engine MAPE.
///
/// Undefined when either side is absent or the engine MAPE is zero.
pub fn improvement_ratio(mape: Option<f64>, mape_mean: Option<f64>) -> Option<f64> {
    match (mape, mape_mean) {
        (Some(mape), Some(mape_mean)) if mape > 0.0 => Some(mape_mean / mape),
        _ => None,
    }
}

/// Pooled per-cell errors of one batch, across all its columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorPool {
    hybrid: Vec<f64>,
    mean_fill: Vec<f64>,
    imputed_cells: usize,
    excluded_zero_truth: usize,
}

impl ErrorPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one imputed cell against its ground truth.
    pub fn record(&mut self, truth: f64, estimate: f64, mean_fill_estimate: f64) {
        self.imputed_cells += 1;
        match (
            absolute_percentage_error(truth, estimate),
            absolute_percentage_error(truth, mean_fill_estimate),
        ) {
            (Some(hybrid), Some(mean_fill)) => {
                self.hybrid.push(hybrid);
                self.mean_fill.push(mean_fill);
            }
            _ => self.excluded_zero_truth += 1,
        }
    }

    pub fn hybrid_errors(&self) -> &[f64] {
        &self.hybrid
    }

    pub fn mean_fill_errors(&self) -> &[f64] {
        &self.mean_fill
    }

    /// Reduce the pool to batch-level MAPEs.
    ///
    /// A batch in which nothing was imputed scores a MAPE of zero for both
    /// methods. A batch whose every imputed cell had a zero truth value has no
    /// MAPE at all.
    pub fn batch_metrics(&self) -> BatchMetrics {
        let (mape, mape_mean) = if self.imputed_cells == 0 {
            (Some(0.0), Some(0.0))
        } else {
            (mean(&self.hybrid), mean(&self.mean_fill))
        };

        BatchMetrics {
            mape,
            mape_mean,
            improvement: improvement_ratio(mape, mape_mean),
            imputed_cells: self.imputed_cells,
            scored_cells: self.hybrid.len(),
            excluded_zero_truth: self.excluded_zero_truth,
        }
    }
}

/// Metrics of a single processed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    /// MAPE of the engine's estimates
    pub mape: Option<f64>,
    /// MAPE of the mean-fill baseline
    pub mape_mean: Option<f64>,
    /// `mape_mean / mape`
    pub improvement: Option<f64>,
    /// Cells filled in this batch
    pub imputed_cells: usize,
    /// Cells that contributed an error to both samples
    pub scored_cells: usize,
    /// Cells left out because their ground truth was zero
    pub excluded_zero_truth: usize,
}

impl BatchMetrics {
    pub fn summary(&self) -> MetricSummary {
        MetricSummary {
            mape: self.mape,
            mape_mean: self.mape_mean,
            improvement: self.improvement,
        }
    }
}

/// History of batch-level MAPEs for both methods.
///
/// Appended to after every scored batch; only [`MetricAccumulator::reset`]
/// clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricAccumulator {
    hybrid: Vec<f64>,
    mean_fill: Vec<f64>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch's MAPEs. A batch that imputed nothing records 0 for
    /// both methods; an absent MAPE is skipped for its own method only.
    pub fn record(&mut self, batch: &BatchMetrics) {
        if let Some(mape) = batch.mape {
            self.hybrid.push(mape);
        }
        if let Some(mape_mean) = batch.mape_mean {
            self.mean_fill.push(mape_mean);
        }
    }

    pub fn reset(&mut self) {
        self.hybrid.clear();
        self.mean_fill.clear();
    }

    pub fn hybrid_history(&self) -> &[f64] {
        &self.hybrid
    }

    pub fn mean_fill_history(&self) -> &[f64] {
        &self.mean_fill
    }

    pub fn is_empty(&self) -> bool {
        self.hybrid.is_empty() && self.mean_fill.is_empty()
    }

    /// Mean of all recorded batch MAPEs per method, plus the improvement ratio.
    pub fn summary(&self) -> MetricSummary {
        let mape = mean(&self.hybrid);
        let mape_mean = mean(&self.mean_fill);
        MetricSummary {
            mape,
            mape_mean,
            improvement: improvement_ratio(mape, mape_mean),
        }
    }
}

/// Global metrics as handed to a metrics consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    #[serde(rename = "MAPE", default, skip_serializing_if = "Option::is_none")]
    pub mape: Option<f64>,
    #[serde(rename = "MAPE_mean", default, skip_serializing_if = "Option::is_none")]
    pub mape_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement: Option<f64>,
}

impl MetricSummary {
    /// Key/value form; undefined metrics are left out.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        [
            ("MAPE", self.mape),
            ("MAPE_mean", self.mape_mean),
            ("improvement", self.improvement),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mape.is_none() && self.mape_mean.is_none() && self.improvement.is_none()
    }
}
