use thiserror::Error;

/// Failures scoped to one requested table. None of them stops the batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TabulationError {
    /// Fewer than two non-empty levels in a dimension, or no records at all.
    #[error("insufficient data: {dimension} has {levels} non-empty level(s)")]
    InsufficientData { dimension: String, levels: usize },

    #[error("unknown field {field}")]
    UnknownField { field: String },

    #[error("weight column {column} is not present in the dataset")]
    UnknownWeight { column: String },

    #[error("chi-square distribution unavailable: {message}")]
    Distribution { message: String },
}

pub type Result<T> = std::result::Result<T, TabulationError>;
