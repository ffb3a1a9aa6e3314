//! Wire Format Error Types

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire records
#[derive(Debug, Error)]
pub enum WireError {
    /// Wrong number of comma-separated fields
    #[error("Unexpected field count: expected {expected}, got {actual} in '{line}'")]
    FieldCount {
        expected: usize,
        actual: usize,
        line: String,
    },

    /// A field failed numeric conversion
    #[error("Invalid numeric field '{field}': {value}")]
    InvalidField { field: &'static str, value: String },

    /// Record bytes were not valid UTF-8
    #[error("Record is not valid UTF-8")]
    InvalidUtf8,
}
