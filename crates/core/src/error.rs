use crate::frame::ColumnKind;
use polars::prelude::PolarsError;

/// Failures of the in-memory analysis stages.
///
/// Unparseable dates are a cell state (a null in the parsed date column), not an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("column '{field}' not found")]
    MissingColumn { field: String },

    #[error("column '{field}' must be a {expected} column (got {found})")]
    ColumnType {
        field: String,
        expected: ColumnKind,
        found: ColumnKind,
    },

    #[error("not enough data points to compute correlation (need >= {required}, got {found})")]
    InsufficientData { required: usize, found: usize },

    #[error("column '{field}' has zero variance; correlation is undefined")]
    ConstantInput { field: String },

    #[error("correlation is not finite for these inputs ({detail})")]
    NonFinite { detail: String },

    #[error(
        "news covers {count} instruments in '{field}'; pick one instrument before grouping by instrument"
    )]
    MultipleInstruments { field: String, count: usize },

    #[error("invalid indicator parameter: {0}")]
    InvalidParameter(String),

    #[error("frame operation failed: {0}")]
    Frame(String),
}

impl AnalysisError {
    pub fn missing(field: &str) -> Self {
        Self::MissingColumn {
            field: field.to_string(),
        }
    }

    /// True for failures caused by the data itself rather than by the schema.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::ConstantInput { .. } | Self::NonFinite { .. }
        )
    }

    /// True when the caller named or configured something the input cannot satisfy.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn { .. }
                | Self::ColumnType { .. }
                | Self::MultipleInstruments { .. }
                | Self::InvalidParameter(_)
        )
    }
}

impl From<PolarsError> for AnalysisError {
    fn from(err: PolarsError) -> Self {
        Self::Frame(err.to_string())
    }
}
