//! Conversion between polars frames and [`TimeTable`]s.
//!
//! Ingestion picks the time column (explicit name, else the first column),
//! turns it into millisecond timestamps, takes every other numeric column as a
//! data column and sorts rows by time. Emission writes the filled columns
//! back into the sorted input frame as `Float64`; non-numeric columns pass
//! through untouched.

use crate::error::{ImputeError, Result, ResultExt};
use crate::table::{self, TimeTable};
use crate::utils::{column_to_f64, is_numeric_dtype, parse_timestamp_ms, to_millis};
use polars::prelude::*;
use tracing::debug;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// A table read from a frame, plus what is needed to write it back.
#[derive(Debug, Clone)]
pub struct FrameTable {
    table: TimeTable,
    frame: DataFrame,
    order: Vec<usize>,
}

impl FrameTable {
    /// Read `df` into a time-sorted [`TimeTable`].
    ///
    /// # Errors
    ///
    /// [`ImputeError::MissingTimeColumn`] if the time column does not exist,
    /// [`ImputeError::InvalidTimestamp`] if a time value is null or unparseable.
    pub fn from_frame(df: &DataFrame, time_column: Option<&str>) -> Result<Self> {
        let time_name = match time_column {
            Some(name) => name.to_string(),
            None => df
                .get_column_names()
                .first()
                .map(|name| name.to_string())
                .ok_or_else(|| ImputeError::MissingTimeColumn("<first column>".to_string()))?,
        };

        let time_col = df
            .column(&time_name)
            .map_err(|_| ImputeError::MissingTimeColumn(time_name.clone()))?;
        let timestamps = timestamps_ms(time_col)?;

        let mut columns = Vec::new();
        for col in df.get_columns() {
            if col.name().as_str() == time_name {
                continue;
            }
            if !is_numeric_dtype(col.dtype()) {
                debug!("Skipping non-numeric column '{}' ({})", col.name(), col.dtype());
                continue;
            }
            let values = column_to_f64(col).context(format!("Reading column '{}'", col.name()))?;
            columns.push(table::Column::new(col.name().as_str(), values));
        }

        let mut table = TimeTable::new(time_name, timestamps, columns)?;
        let order = table.sort_order();
        let frame = if table.is_sorted() {
            df.clone()
        } else {
            debug!("Sorting {} rows by '{}'", table.height(), table.time_name());
            table.reorder(&order)?;
            take_rows(df, &order)?
        };

        Ok(Self {
            table,
            frame,
            order,
        })
    }

    pub fn table(&self) -> &TimeTable {
        &self.table
    }

    /// The input frame in time order.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Row permutation applied on ingestion (sorted row `i` = input row `order[i]`).
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Read ground truth that is row-aligned with the *input* frame.
    ///
    /// Only the data columns of this table are read; the truth frame needs no
    /// time column. Rows get the same permutation as the input.
    pub fn align_truth(&self, truth: &DataFrame) -> Result<TimeTable> {
        if truth.height() != self.order.len() {
            return Err(ImputeError::LengthMismatch {
                expected: self.order.len(),
                actual: truth.height(),
            });
        }

        let mut columns = Vec::with_capacity(self.table.width());
        for name in self.table.column_names() {
            let col = truth
                .column(name)
                .map_err(|_| ImputeError::ColumnNotFound(name.to_string()))
                .context("Reading ground truth")?;
            let values = column_to_f64(col)?;
            let sorted = self.order.iter().map(|&row| values[row]).collect();
            columns.push(table::Column::new(name, sorted));
        }

        TimeTable::new(
            self.table.time_name(),
            self.table.timestamps().to_vec(),
            columns,
        )
    }

    /// Write `filled` back over the sorted input frame.
    pub fn to_frame(&self, filled: &TimeTable) -> Result<DataFrame> {
        if filled.height() != self.frame.height() {
            return Err(ImputeError::LengthMismatch {
                expected: self.frame.height(),
                actual: filled.height(),
            });
        }

        let mut out = self.frame.clone();
        for column in filled.columns() {
            let series = Series::new(column.name.as_str().into(), column.values.clone());
            out.replace(&column.name, series)
                .context(format!("Writing column '{}'", column.name))?;
        }
        Ok(out)
    }
}

fn take_rows(df: &DataFrame, order: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "order".into(),
        order.iter().map(|&row| row as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

fn invalid(row: usize, value: impl Into<String>) -> ImputeError {
    ImputeError::InvalidTimestamp {
        row,
        value: value.into(),
    }
}

/// Milliseconds since the Unix epoch for every row of a time column.
///
/// Numeric time columns are read as seconds.
fn timestamps_ms(col: &Column) -> Result<Vec<i64>> {
    match col.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let raw = col.cast(&DataType::Int64)?;
            raw.i64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| v.map(|v| to_millis(v, unit)).ok_or_else(|| invalid(row, "null")))
                .collect()
        }
        DataType::Date => {
            let days = col.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.map(|d| i64::from(d) * MILLIS_PER_DAY)
                        .ok_or_else(|| invalid(row, "null"))
                })
                .collect()
        }
        DataType::String => col
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(s) => parse_timestamp_ms(s).ok_or_else(|| invalid(row, s)),
                None => Err(invalid(row, "null")),
            })
            .collect(),
        dtype if is_numeric_dtype(dtype) => column_to_f64(col)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.map(|seconds| (seconds * 1000.0).round() as i64)
                    .ok_or_else(|| invalid(row, "null"))
            })
            .collect(),
        other => Err(invalid(0, format!("unsupported time column type {other}"))),
    }
}
