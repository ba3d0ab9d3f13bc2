//! Service configuration from environment variables

use anyhow::{Context, Result};
use custlink_postgres::DatabaseConfig;
use std::path::PathBuf;

/// Default upload limit, 10MB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
    /// Directory where uploads are spooled before ingestion
    pub spool_dir: PathBuf,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load from the process environment
    ///
    /// `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig::from_lookup(&lookup)?;

        let host = lookup("INTAKE_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match lookup("INTAKE_PORT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid INTAKE_PORT: {}", value))?,
            None => 8080,
        };

        let max_upload_bytes = match lookup("INTAKE_MAX_UPLOAD_BYTES") {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid INTAKE_MAX_UPLOAD_BYTES: {}", value))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let spool_dir = lookup("INTAKE_SPOOL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            host,
            port,
            max_upload_bytes,
            spool_dir,
            database,
        })
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
