//! # CustLink Postgres Adapter
//!
//! Implements the domain `RecordStore` port on top of a `sqlx` Postgres pool.

pub mod config;
pub mod infrastructure;

pub use config::{DatabaseConfig, DatabaseConfigError};
pub use infrastructure::{PgRecordStore, PgSession};
