//! Error handling for the job filter

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobFilterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unparsable model response: {0}")]
    UnparsableResponse(String),

    #[error("Language model call timed out after {0:?}")]
    TransportTimeout(Duration),

    #[error("No postings to rank")]
    CorpusEmpty,

    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

/// Coarse classification of failures, used to decide how a posting degrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required posting text is absent; the posting is rejected.
    MissingField,
    /// Model output could not be trusted; verdict becomes all-unknown.
    UnparsableResponse,
    /// Model call exceeded its deadline; verdict becomes all-unknown.
    TransportTimeout,
    /// Nothing to rank; the run returns empty.
    CorpusEmpty,
    Other,
}

impl JobFilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobFilterError::MissingField(_) => ErrorKind::MissingField,
            JobFilterError::UnparsableResponse(_) => ErrorKind::UnparsableResponse,
            JobFilterError::TransportTimeout(_) => ErrorKind::TransportTimeout,
            JobFilterError::CorpusEmpty => ErrorKind::CorpusEmpty,
            _ => ErrorKind::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, JobFilterError>;

/// Convert anyhow errors to our custom error type
impl From<anyhow::Error> for JobFilterError {
    fn from(err: anyhow::Error) -> Self {
        JobFilterError::Processing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            JobFilterError::MissingField("description".to_string()).kind(),
            ErrorKind::MissingField
        );
        assert_eq!(
            JobFilterError::TransportTimeout(Duration::from_secs(1)).kind(),
            ErrorKind::TransportTimeout
        );
        assert_eq!(JobFilterError::CorpusEmpty.kind(), ErrorKind::CorpusEmpty);
        assert_eq!(
            JobFilterError::InvalidInput("x".to_string()).kind(),
            ErrorKind::Other
        );
    }
}
