//! Upload handler

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use custlink_domain::{ingestion::ports::IngestionServicePort, IngestionError};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::{
    dto::upload::{ErrorResponse, UploadForm, UploadResponse},
    spool::SpooledUpload,
    AppState,
};

/// Name of the multipart field carrying the file
pub const FILE_FIELD: &str = "file";

/// Failures of the upload endpoint
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Missing multipart field 'file'")]
    MissingFile,

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Failed to spool upload: {0}")]
    Spool(#[from] std::io::Error),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            UploadError::MissingFile => (StatusCode::BAD_REQUEST, ErrorResponse::new(self.to_string())),
            UploadError::Multipart(err) => (err.status(), ErrorResponse::new(err.body_text())),
            UploadError::Spool(_) => {
                error!(error = %self, "Spooling failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Failed to save the uploaded file"),
                )
            }
            UploadError::Ingestion(err @ IngestionError::SourceReadFailure(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorResponse::new(err.to_string()))
            }
            UploadError::Ingestion(err @ IngestionError::PersistenceFailure { persisted, .. }) => {
                error!(error = %err, persisted, "Ingestion stopped by a persistence failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(err.to_string()).with_persisted(*persisted),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Handle customer file uploads
///
/// The first `file` field is streamed to a spool file, then ingested. Later
/// `file` fields and other fields are ignored.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File ingested", body = UploadResponse),
        (status = 400, description = "Bad request - missing file field or malformed multipart body", body = ErrorResponse),
        (status = 413, description = "Payload too large", body = ErrorResponse),
        (status = 422, description = "File content could not be read", body = ErrorResponse),
        (status = 500, description = "Record store failure", body = ErrorResponse)
    ),
    tag = "ingestion"
)]
#[instrument(skip(state, multipart))]
pub async fn upload_handler<S>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, UploadError>
where
    S: IngestionServicePort + 'static,
{
    let mut spooled: Option<SpooledUpload> = None;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            warn!(field = ?field.name(), "Ignoring unexpected multipart field");
            continue;
        }
        if spooled.is_some() {
            warn!("Ignoring repeated file field");
            continue;
        }

        let mut spool = SpooledUpload::create(&state.spool_dir).await?;
        while let Some(chunk) = field.chunk().await? {
            spool.write_chunk(&chunk).await?;
        }
        spooled = Some(spool);
    }

    let mut spool = spooled.ok_or(UploadError::MissingFile)?;
    info!(
        path = %spool.path().display(),
        size = spool.size(),
        "Received customer file"
    );

    let source = spool.open().await?;
    let outcome = state.ingestion_service.run(source).await;
    spool.remove().await;
    let report = outcome?;

    info!(persisted = report.persisted, "Customer file ingested");
    Ok(Json(UploadResponse::from(report)))
}
