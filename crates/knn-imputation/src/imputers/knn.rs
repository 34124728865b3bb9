use crate::config::DEFAULT_EPSILON;
use crate::error::{ImputeError, Result};
use crate::table::time_numeric;
use crate::types::{FillMethod, ImputedCell};
use tracing::debug;

/// Time-weighted K-nearest-neighbor estimator for a single column.
///
/// Distance between two rows is the absolute difference of their elapsed
/// seconds; each selected neighbor is weighted by `1 / (distance + epsilon)`.
#[derive(Debug, Clone, Copy)]
pub struct TimeKnnImputer {
    n_neighbors: usize,
    epsilon: f64,
}

impl TimeKnnImputer {
    /// Create a new KNN imputer with specified number of neighbors
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1), // Ensure at least 1 neighbor
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Override the distance floor used in the neighbor weights.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Estimate the value of `target` from the column's current known values.
    ///
    /// `values` is the column as it stands right now, so values filled earlier
    /// in the same pass count as known. Does not mutate anything.
    ///
    /// # Errors
    ///
    /// [`ImputeError::EmptyNeighborhood`] if the column holds no present value.
    pub fn estimate(
        &self,
        column: &str,
        values: &[Option<f64>],
        timestamps: &[i64],
        target: usize,
    ) -> Result<f64> {
        if values.len() != timestamps.len() {
            return Err(ImputeError::LengthMismatch {
                expected: timestamps.len(),
                actual: values.len(),
            });
        }
        if target >= values.len() {
            return Err(ImputeError::LengthMismatch {
                expected: target + 1,
                actual: values.len(),
            });
        }

        let seconds = time_numeric(timestamps);
        let target_time = seconds[target];

        // Known set in row order: (distance, value)
        let mut neighbors: Vec<(f64, f64)> = values
            .iter()
            .zip(&seconds)
            .filter_map(|(value, &time)| value.map(|v| ((time - target_time).abs(), v)))
            .collect();

        if neighbors.is_empty() {
            return Err(ImputeError::EmptyNeighborhood {
                column: column.to_string(),
                row: target,
            });
        }

        // Stable sort: equal distances keep row order, so earlier rows win ties
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));

        let k = self.n_neighbors.min(neighbors.len());

        // Weighted mean taken as an offset from the nearest value, so one
        // neighbor (or identical neighbor values) comes back bit-for-bit.
        let anchor = neighbors[0].1;
        let (weighted_offset, weight_sum) =
            neighbors[..k]
                .iter()
                .fold((0.0, 0.0), |(weighted_offset, weight_sum), &(distance, value)| {
                    let weight = 1.0 / (distance + self.epsilon);
                    (weighted_offset + weight * (value - anchor), weight_sum + weight)
                });

        Ok(anchor + weighted_offset / weight_sum)
    }

    /// Fill every missing cell of `values` with KNN, in ascending row order.
    ///
    /// Each estimate is written back before the next one is computed, so it
    /// is part of the known set for every later row.
    pub fn impute_column(
        &self,
        column: &str,
        values: &mut [Option<f64>],
        timestamps: &[i64],
    ) -> Result<Vec<ImputedCell>> {
        let mut cells = Vec::new();

        for row in 0..values.len() {
            if values[row].is_some() {
                continue;
            }
            let value = self.estimate(column, values, timestamps, row)?;
            debug!("KNN (time): column '{}', row {}, value {:.4}", column, row, value);
            values[row] = Some(value);
            cells.push(ImputedCell {
                row,
                value,
                method: FillMethod::Knn,
            });
        }

        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600_000;

    fn hourly(n: usize) -> Vec<i64> {
        (0..n as i64).map(|h| h * HOUR).collect()
    }

    // ========================================================================
    // TimeKnnImputer::new() tests
    // ========================================================================

    #[test]
    fn test_new_with_valid_neighbors() {
        let imputer = TimeKnnImputer::new(5);
        assert_eq!(imputer.n_neighbors(), 5);
        assert_eq!(imputer.epsilon(), 1e-5);
    }

    #[test]
    fn test_new_with_zero_neighbors_defaults_to_one() {
        let imputer = TimeKnnImputer::new(0);
        assert_eq!(imputer.n_neighbors(), 1);
    }

    // ========================================================================
    // estimate() tests
    // ========================================================================

    #[test]
    fn test_k1_returns_nearest_value_exactly() {
        let imputer = TimeKnnImputer::new(1);
        let values = [Some(10.0), None, None, Some(16.0), Some(20.0)];

        let estimate = imputer.estimate("v", &values, &hourly(5), 2).unwrap();
        assert_eq!(estimate, 16.0);
    }

    #[test]
    fn test_weighted_by_inverse_time_distance() {
        let imputer = TimeKnnImputer::new(2);
        let values = [Some(10.0), None, None, Some(16.0), Some(20.0)];

        // Neighbors: row 0 at 3600s, row 3 at 7200s -> weights 2:1
        let estimate = imputer.estimate("v", &values, &hourly(5), 1).unwrap();
        assert!((estimate - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_irregular_sampling_uses_time_not_row_distance() {
        let imputer = TimeKnnImputer::new(1);
        // Row 1 is one row from both neighbors but much closer in time to row 2
        let timestamps = [0, 100 * HOUR, 101 * HOUR];
        let values = [Some(1.0), None, Some(50.0)];

        let estimate = imputer.estimate("v", &values, &timestamps, 1).unwrap();
        assert_eq!(estimate, 50.0);
    }

    #[test]
    fn test_k_saturates_at_known_set_size() {
        let values = [Some(3.0), None, Some(7.0), None, Some(11.0)];
        let timestamps = [0, 10_000, 25_000, 31_000, 60_000];

        let at_size = TimeKnnImputer::new(3)
            .estimate("v", &values, &timestamps, 3)
            .unwrap();
        let beyond = TimeKnnImputer::new(50)
            .estimate("v", &values, &timestamps, 3)
            .unwrap();
        assert_eq!(at_size, beyond);
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let imputer = TimeKnnImputer::new(1);
        // Rows 0 and 2 are both one hour away from row 1
        let values = [Some(5.0), None, Some(9.0)];

        let estimate = imputer.estimate("v", &values, &hourly(3), 1).unwrap();
        assert_eq!(estimate, 5.0);
    }

    #[test]
    fn test_duplicate_timestamp_dominates() {
        let imputer = TimeKnnImputer::new(2);
        // Row 1 shares its timestamp with row 0 -> distance 0, weight 1e5
        let timestamps = [0, 0, 10 * HOUR];
        let values = [Some(10.0), None, Some(1000.0)];

        let estimate = imputer.estimate("v", &values, &timestamps, 1).unwrap();
        assert!((estimate - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_empty_neighborhood_is_an_error() {
        let imputer = TimeKnnImputer::new(3);
        let values = [None, None, None];

        let err = imputer.estimate("humidity", &values, &hourly(3), 1).unwrap_err();
        assert!(matches!(
            err,
            ImputeError::EmptyNeighborhood { ref column, row: 1 } if column == "humidity"
        ));
    }

    #[test]
    fn test_misaligned_inputs_are_rejected() {
        let imputer = TimeKnnImputer::new(3);
        let err = imputer
            .estimate("v", &[Some(1.0), None], &hourly(3), 1)
            .unwrap_err();
        assert!(matches!(err, ImputeError::LengthMismatch { .. }));
    }

    #[test]
    fn test_estimate_does_not_mutate_input() {
        let imputer = TimeKnnImputer::new(2);
        let values = vec![Some(1.0), None, Some(3.0)];
        let before = values.clone();

        imputer.estimate("v", &values, &hourly(3), 1).unwrap();
        assert_eq!(values, before);
    }

    // ========================================================================
    // impute_column() tests
    // ========================================================================

    #[test]
    fn test_impute_column_fills_every_gap_sequentially() {
        let imputer = TimeKnnImputer::new(1);
        let mut values = vec![None, None, Some(4.0), None];

        let cells = imputer.impute_column("v", &mut values, &hourly(4)).unwrap();

        // Row 0's nearest known is row 2 at that point; row 1 then sees row 0
        // and row 2 at equal distance and picks row 0.
        assert_eq!(values, vec![Some(4.0), Some(4.0), Some(4.0), Some(4.0)]);
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|c| c.method == FillMethod::Knn));
        assert_eq!(
            cells.iter().map(|c| c.row).collect::<Vec<_>>(),
            vec![0, 1, 3]
        );
    }

    #[test]
    fn test_impute_column_all_missing_fails() {
        let imputer = TimeKnnImputer::new(2);
        let mut values = vec![None, None];

        let err = imputer.impute_column("v", &mut values, &hourly(2)).unwrap_err();
        assert!(matches!(err, ImputeError::EmptyNeighborhood { row: 0, .. }));
    }
}
