//! Imputation module for handling missing values.
//!
//! This module provides the per-cell estimators used by the fill engine:
//! - Time-weighted KNN imputation
//! - Mean-fill baseline (original column mean)

mod knn;
mod statistical;

pub use knn::TimeKnnImputer;
pub use statistical::MeanFillImputer;
