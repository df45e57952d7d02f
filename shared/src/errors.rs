//! Shared error types for the worksheet generation system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid pair count: {value} (allowed: 3, 4 or 5)")]
    InvalidPairCount { value: u8 },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
