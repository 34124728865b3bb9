//! Mean-fill baseline.
//!
//! Every missing cell of a column gets the arithmetic mean of the values that
//! were present in the column before any filling took place. Used only as the
//! comparison baseline for scoring; never written to the delivered output.

/// Naive imputation with the column's original mean.
pub struct MeanFillImputer;

impl MeanFillImputer {
    /// Mean of the present values, or `None` if the column has none.
    pub fn original_mean(values: &[Option<f64>]) -> Option<f64> {
        let (sum, count) = values
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Fill a copy of the column with its original mean.
    ///
    /// The mean is computed once up front, so filled cells never feed back
    /// into it. Returns the values unchanged when nothing is present.
    pub fn fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
        match Self::original_mean(values) {
            Some(mean) => values.iter().map(|v| Some(v.unwrap_or(mean))).collect(),
            None => values.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_mean_ignores_missing() {
        let values = [Some(1.0), None, Some(5.0), None];
        assert_eq!(MeanFillImputer::original_mean(&values), Some(3.0));
    }

    #[test]
    fn test_original_mean_all_missing() {
        assert_eq!(MeanFillImputer::original_mean(&[None, None]), None);
        assert_eq!(MeanFillImputer::original_mean(&[]), None);
    }

    #[test]
    fn test_fill_uses_original_not_running_mean() {
        let values = [Some(10.0), None, None, Some(20.0)];
        let filled = MeanFillImputer::fill(&values);
        assert_eq!(filled, vec![Some(10.0), Some(15.0), Some(15.0), Some(20.0)]);
    }

    #[test]
    fn test_fill_preserves_present_values() {
        let values = [Some(2.0), Some(4.0)];
        assert_eq!(MeanFillImputer::fill(&values), values.to_vec());
    }

    #[test]
    fn test_fill_all_missing_is_noop() {
        let values = [None, None];
        assert_eq!(MeanFillImputer::fill(&values), vec![None, None]);
    }
}
