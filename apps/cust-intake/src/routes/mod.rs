//! API routes

pub mod upload;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use custlink_domain::ingestion::ports::IngestionServicePort;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    dto::upload::{ErrorResponse, UploadForm, UploadResponse},
    handlers, AppState,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::upload::upload_handler,
        health_handler
    ),
    components(
        schemas(UploadForm, UploadResponse, ErrorResponse)
    ),
    tags(
        (name = "ingestion", description = "Customer file ingestion endpoints"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "CustIntake API",
        version = "0.1.0",
        description = "Customer file upload service for CustLink",
        contact(
            name = "CustLink Team"
        )
    )
)]
pub struct ApiDoc;

/// Create the main application router
///
/// Request bodies above `max_upload_bytes` are refused with 413.
pub fn create_router<S>(state: AppState<S>, max_upload_bytes: usize) -> Router
where
    S: IngestionServicePort + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(upload::routes::<S>())
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    ),
    tag = "health"
)]
async fn health_handler() -> &'static str {
    "OK"
}
