//! Domain errors for ingestion operations
//!
//! Only two conditions ever abort an ingestion run: the uploaded content
//! could not be read, or the record store failed. Bad lines and bad national
//! IDs are [`Rejection`]s, which filter records out without failing the run.

use thiserror::Error;

/// Errors that abort an ingestion run
#[derive(Error, Debug)]
pub enum IngestionError {
    /// The uploaded content could not be read; nothing was persisted
    #[error("Failed to read source content: {0}")]
    SourceReadFailure(String),

    /// The record store failed partway through the batch
    ///
    /// Records persisted before the failure stay persisted.
    #[error("Persistence failed after {persisted} record(s): {cause}")]
    PersistenceFailure {
        persisted: usize,
        #[source]
        cause: StoreError,
    },
}

impl IngestionError {
    /// Create a source read failure with a message
    pub fn source_read_failure(msg: impl Into<String>) -> Self {
        Self::SourceReadFailure(msg.into())
    }

    /// Create a persistence failure after `persisted` successful writes
    pub fn persistence_failure(persisted: usize, cause: StoreError) -> Self {
        Self::PersistenceFailure { persisted, cause }
    }

    /// Number of records durably written before the run failed
    pub fn persisted(&self) -> usize {
        match self {
            Self::SourceReadFailure(_) => 0,
            Self::PersistenceFailure { persisted, .. } => *persisted,
        }
    }
}

impl From<std::io::Error> for IngestionError {
    fn from(err: std::io::Error) -> Self {
        Self::SourceReadFailure(err.to_string())
    }
}

/// Errors reported by a record store adapter
///
/// These abstract away the backend (no sqlx types here).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or no handle could be acquired
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// The store refused to write a record
    #[error("Record write rejected: {0}")]
    WriteRejected(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn write_rejected(msg: impl Into<String>) -> Self {
        Self::WriteRejected(msg.into())
    }
}

/// Why a line of input did not become a persisted record
///
/// Rejections are never returned as errors; they are counted in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The line had fewer than eight tokens in its first tab field
    MalformedLine { line: usize },

    /// The line was not valid UTF-8
    UndecodableLine { line: usize },

    /// The line's national ID failed checksum validation
    InvalidIdentifier { line: usize },
}

impl Rejection {
    /// 1-based line number in the uploaded file
    pub fn line(&self) -> usize {
        match self {
            Self::MalformedLine { line }
            | Self::UndecodableLine { line }
            | Self::InvalidIdentifier { line } => *line,
        }
    }
}

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestionError>;
