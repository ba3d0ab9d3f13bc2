//! Ingestion domain module
//!
//! This module contains the core business logic for customer file ingestion.
//! It defines how raw lines become records and how records flow through the
//! ingestion pipeline into a record store.

pub mod error;
pub mod national_id;
pub mod parser;
pub mod ports;
pub mod record;
pub mod service;

pub use error::{IngestionError, Rejection, Result, StoreError};
pub use national_id::NationalId;
pub use parser::{ParsedLine, ParsedLines};
pub use record::{Batch, CandidateRecord, ValidatedRecord};
pub use service::{IngestionConfig, IngestionReport, IngestionService};
