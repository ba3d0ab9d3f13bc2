//! # CustLink Domain Layer
//!
//! This crate contains the pure business logic for ingesting customer files
//! into CustLink. It follows hexagonal architecture principles:
//!
//! - **Entities**: Core domain models (CandidateRecord, ValidatedRecord, Batch)
//! - **Ports**: Trait definitions for external dependencies (RecordStore)
//! - **Services**: The ingestion pipeline orchestration
//!
//! ## Architecture
//!
//! This layer has NO dependencies on infrastructure concerns (Postgres, HTTP, etc.).
//! The record store is expressed as a trait (port) implemented by adapter crates.
//!
//! ## Example
//!
//! ```rust,no_run
//! use custlink_domain::ingestion::IngestionService;
//! use custlink_domain::ports::RecordStore;
//!
//! // The service is generic over any RecordStore implementation
//! async fn example<R: RecordStore>(service: IngestionService<R>) {
//!     let content = "header\n11144477730 0 0 2013-05-13 100,00 100,00 79.379.491/0008-50 79.379.491/0008-50\n";
//!     let report = service.run_text(content).await.unwrap();
//!     println!("Persisted {} records", report.persisted);
//! }
//! ```

pub mod ingestion;
pub mod storage;

pub use storage::ports;

// Re-export commonly used types
pub use ingestion::{
    Batch, CandidateRecord, IngestionError, IngestionReport, IngestionService, NationalId,
    ValidatedRecord,
};
pub use ports::{RecordStore, StoreSession};
