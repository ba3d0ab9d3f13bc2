//! CustIntake - Customer File Upload Service
//!
//! HTTP service receiving customer files and ingesting them into CustLink.
//! Each upload is spooled to its own temporary file, parsed, validated and
//! written to Postgres before the response is sent.

mod config;
mod dto;
mod handlers;
mod routes;
mod spool;

use anyhow::{Context, Result};
use custlink_domain::ingestion::{IngestionConfig, IngestionService};
use custlink_postgres::PgRecordStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Application state shared across handlers
pub struct AppState<S> {
    pub ingestion_service: Arc<S>,
    pub spool_dir: PathBuf,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ingestion_service: Arc::clone(&self.ingestion_service),
            spool_dir: self.spool_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting CustIntake upload service");

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    info!(
        max_connections = config.database.max_connections,
        "Connecting to Postgres record store"
    );

    let store = PgRecordStore::connect(&config.database)
        .await
        .context("Failed to connect to Postgres")?;

    // Create ingestion service
    let service = IngestionService::new(
        store,
        IngestionConfig {
            max_content_bytes: config.max_upload_bytes,
        },
    );

    // Create shared application state
    let state = AppState {
        ingestion_service: Arc::new(service),
        spool_dir: config.spool_dir.clone(),
    };

    // Build HTTP router
    let app = routes::create_router(state, config.max_upload_bytes);

    let addr = config.bind_addr();
    info!(addr = %addr, spool_dir = %config.spool_dir.display(), "Starting HTTP server");

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
