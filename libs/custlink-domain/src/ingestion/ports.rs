//! Port trait for the Ingestion Service
//!
//! This module defines the trait that abstracts the ingestion pipeline.
//! This allows for mocking the pipeline itself at the application layer,
//! while the concrete `IngestionService` in `service.rs` provides the implementation.

use std::future::Future;

use tokio::io::AsyncRead;

use crate::ingestion::{error::IngestionError, service::IngestionReport};

/// Port trait for ingestion operations
///
/// Implemented by the concrete `IngestionService<R>` and by test doubles at the
/// application/adapter layer.
pub trait IngestionServicePort: Send + Sync {
    /// Ingest an uploaded customer file read from `source`
    ///
    /// # Returns
    ///
    /// The run report; `persisted` is the number of records written
    ///
    /// # Errors
    ///
    /// - `IngestionError::SourceReadFailure` if the content cannot be read
    /// - `IngestionError::PersistenceFailure` if the record store fails
    fn run<S>(&self, source: S) -> impl Future<Output = Result<IngestionReport, IngestionError>> + Send
    where
        S: AsyncRead + Unpin + Send;

    /// Ingest content that is already buffered as text
    ///
    /// # Errors
    ///
    /// Returns `IngestionError::PersistenceFailure` if the record store fails
    fn run_text(
        &self,
        content: &str,
    ) -> impl Future<Output = Result<IngestionReport, IngestionError>> + Send;
}
