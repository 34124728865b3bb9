//! Configuration types for the imputation engine.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic engine setup.

use serde::{Deserialize, Serialize};

/// Default number of neighbors for the time-weighted KNN fallback.
pub const DEFAULT_K: usize = 3;

/// Default minimum row count for a fill-with-metrics pass.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default floor added to every neighbor distance before inverting it.
pub const DEFAULT_EPSILON: f64 = 1e-5;

/// Strategy used to fill missing cells of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FillStrategy {
    /// Interpolate between present neighbors, fall back to time-weighted KNN
    #[default]
    Hybrid,
    /// Use time-weighted KNN for every missing cell
    KnnOnly,
}

/// Configuration for the fill engine.
///
/// Use [`ImputerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use knn_imputation::config::{ImputerConfig, FillStrategy};
///
/// let config = ImputerConfig::builder()
///     .k(5)
///     .batch_size(24)
///     .strategy(FillStrategy::Hybrid)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputerConfig {
    /// Number of nearest-in-time neighbors used by the KNN fallback.
    /// Default: 3
    pub k: usize,

    /// Minimum number of rows a table needs before a fill-with-metrics
    /// pass is attempted.
    /// Default: 10
    pub batch_size: usize,

    /// Distance floor in the `1 / (distance + epsilon)` neighbor weight.
    /// Default: 1e-5
    pub epsilon: f64,

    /// How missing cells are filled.
    /// Default: Hybrid
    pub strategy: FillStrategy,

    /// Name of the time column.
    /// If None, the first column of the input frame is used.
    /// Default: None
    pub time_column: Option<String>,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            batch_size: DEFAULT_BATCH_SIZE,
            epsilon: DEFAULT_EPSILON,
            strategy: FillStrategy::default(),
            time_column: None,
        }
    }
}

impl ImputerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputerConfigBuilder {
        ImputerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.k == 0 {
            return Err(ConfigValidationError::InvalidNeighbors(self.k));
        }

        if self.batch_size == 0 {
            return Err(ConfigValidationError::InvalidBatchSize(self.batch_size));
        }

        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ConfigValidationError::InvalidEpsilon(self.epsilon));
        }

        if let Some(ref name) = self.time_column
            && name.trim().is_empty()
        {
            return Err(ConfigValidationError::EmptyTimeColumn);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid KNN neighbors: {0} (must be at least 1)")]
    InvalidNeighbors(usize),

    #[error("Invalid batch size: {0} (must be at least 1)")]
    InvalidBatchSize(usize),

    #[error("Invalid epsilon: {0} (must be finite and greater than 0)")]
    InvalidEpsilon(f64),

    #[error("Time column name must not be empty")]
    EmptyTimeColumn,
}

/// Builder for [`ImputerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputerConfigBuilder {
    k: Option<usize>,
    batch_size: Option<usize>,
    epsilon: Option<f64>,
    strategy: Option<FillStrategy>,
    time_column: Option<String>,
}

impl ImputerConfigBuilder {
    /// Set the number of neighbors for the KNN fallback.
    pub fn k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Set the minimum row count for a fill-with-metrics pass.
    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = Some(rows);
        self
    }

    /// Set the distance floor used by the neighbor weights.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Set the fill strategy.
    pub fn strategy(mut self, strategy: FillStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set an explicit time column.
    ///
    /// If not set, the first column of the input frame is the time axis.
    pub fn time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputerConfig, ConfigValidationError> {
        let config = ImputerConfig {
            k: self.k.unwrap_or(DEFAULT_K),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            epsilon: self.epsilon.unwrap_or(DEFAULT_EPSILON),
            strategy: self.strategy.unwrap_or_default(),
            time_column: self.time_column,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImputerConfig::default();
        assert_eq!(config.k, 3);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.epsilon, 1e-5);
        assert_eq!(config.strategy, FillStrategy::Hybrid);
        assert!(config.time_column.is_none());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ImputerConfig::builder()
            .k(7)
            .batch_size(24)
            .epsilon(1e-3)
            .strategy(FillStrategy::KnnOnly)
            .time_column("DateTime")
            .build()
            .unwrap();

        assert_eq!(config.k, 7);
        assert_eq!(config.batch_size, 24);
        assert_eq!(config.epsilon, 1e-3);
        assert_eq!(config.strategy, FillStrategy::KnnOnly);
        assert_eq!(config.time_column.as_deref(), Some("DateTime"));
    }

    #[test]
    fn test_validation_invalid_neighbors() {
        let result = ImputerConfig::builder().k(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidNeighbors(0)
        ));
    }

    #[test]
    fn test_validation_invalid_batch_size() {
        let result = ImputerConfig::builder().batch_size(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidBatchSize(0)
        ));
    }

    #[test]
    fn test_validation_invalid_epsilon() {
        assert!(ImputerConfig::builder().epsilon(0.0).build().is_err());
        assert!(ImputerConfig::builder().epsilon(-1.0).build().is_err());
        assert!(ImputerConfig::builder().epsilon(f64::NAN).build().is_err());
    }

    #[test]
    fn test_validation_blank_time_column() {
        let result = ImputerConfig::builder().time_column("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyTimeColumn
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "k": 4,
            "batch_size": 12,
            "epsilon": 0.0001,
            "strategy": "KnnOnly",
            "time_column": "timestamp"
        }"#;

        let config: ImputerConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.k, 4);
        assert_eq!(config.batch_size, 12);
        assert_eq!(config.epsilon, 0.0001);
        assert_eq!(config.strategy, FillStrategy::KnnOnly);
        assert_eq!(config.time_column, Some("timestamp".to_string()));
        assert!(config.validate().is_ok());
    }
}
