//! Error types
//!
//! Validation problems are fatal for the table (or record) they concern.
//! Model failures never appear here: the assessor folds them into
//! [`crate::AssessmentResult::Failure`] so one bad call cannot sink a batch.

use thiserror::Error;

/// Coarse classification of an error, used by the server and CLI when
/// choosing a status code or exit message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingRequiredColumns,
    MissingField,
    UnexpectedField,
    DuplicateColumn,
    LengthMismatch,
    Malformed,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required columns: {}", .missing.join(", "))]
    MissingRequiredColumns { missing: Vec<String> },

    #[error("Record is missing field '{field}'")]
    MissingField { field: String },

    #[error("Record has field '{field}' that the table does not declare")]
    UnexpectedField { field: String },

    #[error("Column '{column}' appears more than once in the header")]
    DuplicateColumn { column: String },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingRequiredColumns { .. } => ErrorKind::MissingRequiredColumns,
            ValidationError::MissingField { .. } => ErrorKind::MissingField,
            ValidationError::UnexpectedField { .. } => ErrorKind::UnexpectedField,
            ValidationError::DuplicateColumn { .. } => ErrorKind::DuplicateColumn,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{results} results supplied for {records} records")]
    LengthMismatch { records: usize, results: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(e) => e.kind(),
            Error::Csv(_) | Error::Json(_) => ErrorKind::Malformed,
            Error::Io(_) => ErrorKind::Io,
            Error::LengthMismatch { .. } => ErrorKind::LengthMismatch,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = ValidationError::MissingRequiredColumns {
            missing: vec!["Asset".to_string(), "Risk Owner".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required columns: Asset, Risk Owner");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredColumns);
    }

    #[test]
    fn test_validation_kind_survives_wrapping() {
        let err: Error = ValidationError::DuplicateColumn { column: "Asset".to_string() }.into();
        assert_eq!(err.kind(), ErrorKind::DuplicateColumn);
        assert!(err.to_string().contains("'Asset'"));
    }

    #[test]
    fn test_length_mismatch() {
        let err = Error::LengthMismatch { records: 3, results: 2 };
        assert_eq!(err.kind(), ErrorKind::LengthMismatch);
        assert_eq!(err.to_string(), "2 results supplied for 3 records");
    }
}
