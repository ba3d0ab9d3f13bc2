//! Database connection settings

use thiserror::Error;

/// Errors raised while reading database settings
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DatabaseConfigError {
    /// A required variable is not set
    #[error("{0} not set")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }

    /// Read `DATABASE_URL`, `DB_MAX_CONNECTIONS` and `DB_ACQUIRE_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, DatabaseConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`DatabaseConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DatabaseConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").ok_or(DatabaseConfigError::Missing("DATABASE_URL"))?;
        let mut config = Self::new(url);

        if let Some(value) = lookup("DB_MAX_CONNECTIONS") {
            config.max_connections = parse_var("DB_MAX_CONNECTIONS", value)?;
        }
        if let Some(value) = lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            config.acquire_timeout_secs = parse_var("DB_ACQUIRE_TIMEOUT_SECS", value)?;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    value: String,
) -> Result<T, DatabaseConfigError> {
    value
        .parse()
        .map_err(|_| DatabaseConfigError::Invalid { name, value })
}
