//! In-memory table model the fill engine operates on.
//!
//! A [`TimeTable`] is a time axis (milliseconds since the Unix epoch) plus a
//! set of named numeric [`Column`]s aligned to it. Missing and invalid values
//! are both `None`.

use crate::error::{ImputeError, Result};
use serde::{Deserialize, Serialize};

/// A named sequence of optional numeric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    /// Create a column. Non-finite values are treated as missing.
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Row indices of the missing cells, in ascending order.
    pub fn missing_rows(&self) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(row, v)| v.is_none().then_some(row))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Elapsed seconds from the earliest timestamp to each timestamp.
///
/// The reference point is the minimum over all rows, present or not.
pub fn time_numeric(timestamps_ms: &[i64]) -> Vec<f64> {
    let Some(&min) = timestamps_ms.iter().min() else {
        return Vec::new();
    };
    timestamps_ms
        .iter()
        .map(|&t| (t - min) as f64 / 1000.0)
        .collect()
}

/// A time axis plus the data columns aligned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTable {
    time_name: String,
    timestamps: Vec<i64>,
    columns: Vec<Column>,
}

impl TimeTable {
    /// Build a table, checking that every column matches the time axis length.
    pub fn new(
        time_name: impl Into<String>,
        timestamps: Vec<i64>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        for column in &columns {
            if column.len() != timestamps.len() {
                return Err(ImputeError::LengthMismatch {
                    expected: timestamps.len(),
                    actual: column.len(),
                });
            }
        }
        Ok(Self {
            time_name: time_name.into(),
            timestamps,
            columns,
        })
    }

    pub fn time_name(&self) -> &str {
        &self.time_name
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of data columns (the time axis is not counted).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Total number of missing cells across all data columns.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// TimeNumeric for every row of this table.
    pub fn time_numeric(&self) -> Vec<f64> {
        time_numeric(&self.timestamps)
    }

    /// Whether rows are in ascending (non-decreasing) time order.
    pub fn is_sorted(&self) -> bool {
        self.timestamps.windows(2).all(|w| w[0] <= w[1])
    }

    /// Stable permutation that puts the rows in ascending time order.
    pub fn sort_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.height()).collect();
        order.sort_by_key(|&row| self.timestamps[row]);
        order
    }

    /// Reorder every row according to `order` (new row `i` = old row `order[i]`).
    pub fn reorder(&mut self, order: &[usize]) -> Result<()> {
        if order.len() != self.height() {
            return Err(ImputeError::LengthMismatch {
                expected: self.height(),
                actual: order.len(),
            });
        }
        let mut seen = vec![false; order.len()];
        for &row in order {
            match seen.get_mut(row) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(ImputeError::InvalidRowOrder {
                        index: row,
                        rows: order.len(),
                    });
                }
            }
        }
        self.timestamps = order.iter().map(|&row| self.timestamps[row]).collect();
        for column in &mut self.columns {
            column.values = order.iter().map(|&row| column.values[row]).collect();
        }
        Ok(())
    }

    /// Replace the data columns, keeping the time axis.
    pub(crate) fn with_columns(&self, columns: Vec<Column>) -> Result<Self> {
        Self::new(self.time_name.clone(), self.timestamps.clone(), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly(n: usize) -> Vec<i64> {
        (0..n as i64).map(|h| 1_700_000_000_000 + h * 3_600_000).collect()
    }

    // ========================================================================
    // Column tests
    // ========================================================================

    #[test]
    fn test_column_normalises_non_finite_to_missing() {
        let column = Column::new(
            "temp",
            vec![Some(1.0), Some(f64::NAN), Some(f64::INFINITY), None],
        );
        assert_eq!(column.values, vec![Some(1.0), None, None, None]);
        assert_eq!(column.missing_count(), 3);
        assert_eq!(column.missing_rows(), vec![1, 2, 3]);
        assert!(!column.is_complete());
    }

    // ========================================================================
    // time_numeric tests
    // ========================================================================

    #[test]
    fn test_time_numeric_uses_table_minimum() {
        let seconds = time_numeric(&[5_000, 2_000, 3_500]);
        assert_eq!(seconds, vec![3.0, 0.0, 1.5]);
    }

    #[test]
    fn test_time_numeric_empty() {
        assert!(time_numeric(&[]).is_empty());
    }

    // ========================================================================
    // TimeTable tests
    // ========================================================================

    #[test]
    fn test_new_rejects_misaligned_column() {
        let result = TimeTable::new(
            "DateTime",
            hourly(3),
            vec![Column::new("a", vec![Some(1.0), None])],
        );
        assert!(matches!(
            result.unwrap_err(),
            ImputeError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_sort_order_is_stable() {
        let table = TimeTable::new(
            "t",
            vec![30, 10, 20, 10],
            vec![Column::new("a", vec![Some(3.0), Some(1.0), Some(2.0), Some(1.5)])],
        )
        .unwrap();
        assert!(!table.is_sorted());
        assert_eq!(table.sort_order(), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_reorder_moves_all_columns() {
        let mut table = TimeTable::new(
            "t",
            vec![30, 10, 20],
            vec![
                Column::new("a", vec![Some(3.0), Some(1.0), None]),
                Column::new("b", vec![None, Some(10.0), Some(20.0)]),
            ],
        )
        .unwrap();
        let order = table.sort_order();
        table.reorder(&order).unwrap();

        assert!(table.is_sorted());
        assert_eq!(table.timestamps(), &[10, 20, 30]);
        assert_eq!(table.column("a").unwrap().values, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(table.column("b").unwrap().values, vec![Some(10.0), Some(20.0), None]);
    }

    #[test]
    fn test_reorder_rejects_non_permutation() {
        let mut table = TimeTable::new(
            "t",
            vec![10, 20],
            vec![Column::new("a", vec![Some(1.0), None])],
        )
        .unwrap();
        let before = table.clone();

        let out_of_range = table.reorder(&[0, 5]).unwrap_err();
        assert!(matches!(
            out_of_range,
            ImputeError::InvalidRowOrder { index: 5, rows: 2 }
        ));

        let repeated = table.reorder(&[1, 1]).unwrap_err();
        assert_eq!(repeated.error_code(), "INVALID_ROW_ORDER");

        let short = table.reorder(&[0]).unwrap_err();
        assert_eq!(short.error_code(), "LENGTH_MISMATCH");

        assert_eq!(table, before);
    }

    #[test]
    fn test_table_counts() {
        let table = TimeTable::new(
            "t",
            hourly(4),
            vec![
                Column::new("a", vec![Some(1.0), None, None, Some(4.0)]),
                Column::new("b", vec![Some(1.0), Some(2.0), Some(3.0), None]),
            ],
        )
        .unwrap();
        assert_eq!(table.height(), 4);
        assert_eq!(table.width(), 2);
        assert_eq!(table.missing_count(), 3);
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.time_numeric(), vec![0.0, 3600.0, 7200.0, 10800.0]);
    }
}
