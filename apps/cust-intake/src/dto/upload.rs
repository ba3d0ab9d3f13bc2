//! DTOs for the upload endpoint

use chrono::{DateTime, Utc};
use custlink_domain::IngestionReport;
use serde::Serialize;
use utoipa::ToSchema;

/// Multipart form accepted by the upload endpoint
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// Customer file: a header line, then one customer per line
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Response body for a completed ingestion
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Records written to the store
    #[schema(example = 2)]
    pub persisted: usize,
    /// Data lines in the file, header excluded
    #[schema(example = 4)]
    pub lines_read: usize,
    /// Lines dropped for having fewer than eight fields
    #[schema(example = 1)]
    pub malformed_lines: usize,
    /// Lines dropped because they were not valid UTF-8
    #[schema(example = 0)]
    pub undecodable_lines: usize,
    /// Records dropped because of an invalid national ID
    #[schema(example = 1)]
    pub invalid_identifiers: usize,
    /// When the ingestion finished
    pub completed_at: DateTime<Utc>,
    /// Success message
    #[schema(example = "File ingested successfully")]
    pub message: String,
}

impl From<IngestionReport> for UploadResponse {
    fn from(report: IngestionReport) -> Self {
        Self {
            persisted: report.persisted,
            lines_read: report.lines_read,
            malformed_lines: report.malformed_lines,
            undecodable_lines: report.undecodable_lines,
            invalid_identifiers: report.invalid_identifiers,
            completed_at: Utc::now(),
            message: "File ingested successfully".to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error description
    #[schema(example = "Missing multipart field 'file'")]
    pub error: String,
    /// Records written before a persistence failure
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub persisted: Option<usize>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            persisted: None,
        }
    }

    pub fn with_persisted(mut self, persisted: usize) -> Self {
        self.persisted = Some(persisted);
        self
    }
}
