use serde::{Deserialize, Serialize};

/// How a single missing cell was filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Mean of the immediately preceding and following values
    Interpolation,
    /// Time-weighted average of the nearest known values
    Knn,
}

impl FillMethod {
    /// Returns a human-readable name for the method.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Interpolation => "interpolation",
            Self::Knn => "KNN (time)",
        }
    }
}

/// A cell the engine filled, in the order it was filled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImputedCell {
    pub row: usize,
    pub value: f64,
    pub method: FillMethod,
}

/// Per-column fill counts by method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFillSummary {
    pub column: String,
    pub rows: usize,
    pub missing: usize,
    pub interpolated: usize,
    pub knn: usize,
}

impl ColumnFillSummary {
    pub fn from_cells(column: impl Into<String>, rows: usize, cells: &[ImputedCell]) -> Self {
        let interpolated = cells
            .iter()
            .filter(|c| c.method == FillMethod::Interpolation)
            .count();
        Self {
            column: column.into(),
            rows,
            missing: cells.len(),
            interpolated,
            knn: cells.len() - interpolated,
        }
    }
}
