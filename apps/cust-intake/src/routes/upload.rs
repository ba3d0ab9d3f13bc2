//! Upload routes

use axum::{routing::post, Router};
use custlink_domain::ingestion::ports::IngestionServicePort;

use crate::{handlers::upload::upload_handler, AppState};

/// Create upload routes
pub fn routes<S>() -> Router<AppState<S>>
where
    S: IngestionServicePort + 'static,
{
    Router::new().route("/upload", post(upload_handler::<S>))
}
