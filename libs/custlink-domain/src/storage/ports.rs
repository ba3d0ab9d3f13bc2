//! Ports (trait definitions) for external dependencies
//!
//! This module defines the contracts (ports) that storage adapters must implement.
//! Following hexagonal architecture, the domain defines what it needs, and the
//! infrastructure provides implementations.
//!
//! ## Static Dispatch
//!
//! We use native Rust async traits with `impl Future` return types instead of
//! `async_trait` to keep dispatch static.

use std::future::Future;

use crate::ingestion::{error::StoreError, record::ValidatedRecord};

/// Port for the durable record sink
///
/// A store hands out one [`StoreSession`] per ingestion run. The session owns
/// whatever handle the backend needs (a pooled connection, a file, ...) and
/// releases it when dropped, so the handle never outlives the run, whether it
/// succeeds or fails.
///
/// Stores must accept duplicate national IDs; no uniqueness is imposed.
pub trait RecordStore: Send + Sync {
    /// Session type holding the per-run handle
    type Session: StoreSession;

    /// Acquire a handle for one ingestion run
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if no handle can be acquired
    fn open_session(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;
}

/// A per-run handle to a record store
pub trait StoreSession: Send {
    /// Durably write one validated record
    ///
    /// Each call is an independent write: nothing written by an earlier call
    /// is undone when a later call fails.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the write fails
    fn persist(
        &mut self,
        record: &ValidatedRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
