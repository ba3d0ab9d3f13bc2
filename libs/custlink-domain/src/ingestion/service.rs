//! Ingestion service - Business logic orchestration
//!
//! This module contains the ingestion pipeline: read the uploaded content,
//! parse it into candidate records, keep those whose national ID validates,
//! and write the resulting batch to the record store.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info, instrument};

use super::{
    parser::{self, ParsedLine},
    ports::IngestionServicePort,
    Batch, IngestionError, Rejection, Result,
};
use crate::ports::{RecordStore, StoreSession};

/// Configuration for the ingestion service
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Maximum accepted content size in bytes (default: 10MB)
    pub max_content_bytes: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Outcome of one successful ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionReport {
    /// Data lines seen, header excluded
    pub lines_read: usize,
    /// Lines dropped for having fewer than eight tokens
    pub malformed_lines: usize,
    /// Lines dropped because they were not valid UTF-8
    pub undecodable_lines: usize,
    /// Records dropped because their national ID failed validation
    pub invalid_identifiers: usize,
    /// Records written to the store
    pub persisted: usize,
}

impl IngestionReport {
    fn reject(&mut self, rejection: Rejection) {
        debug!(line = rejection.line(), reason = ?rejection, "Dropping line");
        match rejection {
            Rejection::MalformedLine { .. } => self.malformed_lines += 1,
            Rejection::UndecodableLine { .. } => self.undecodable_lines += 1,
            Rejection::InvalidIdentifier { .. } => self.invalid_identifiers += 1,
        }
    }
}

/// Service for ingesting customer files
///
/// This service encapsulates the business rules for ingestion:
/// - The header line is skipped undecoded
/// - Lines with fewer than eight tokens or invalid UTF-8 are dropped
/// - Records with an invalid national ID are dropped
/// - Remaining records are written in input order, one write per record,
///   stopping at the first failure
///
/// Dropped lines never fail a run. Only unreadable content and store
/// failures do.
///
/// Writes are not deduplicated: ingesting the same file twice stores every
/// record twice.
///
/// ## Static Dispatch
///
/// The service is generic over any `RecordStore` implementation.
pub struct IngestionService<R> {
    repository: R,
    config: IngestionConfig,
}

impl<R> IngestionService<R>
where
    R: RecordStore,
{
    /// Create a new IngestionService with the given repository and configuration
    pub fn new(repository: R, config: IngestionConfig) -> Self {
        Self { repository, config }
    }

    /// Create a new IngestionService with default configuration
    pub fn with_repository(repository: R) -> Self {
        Self::new(repository, IngestionConfig::default())
    }

    /// Ingest an uploaded customer file
    ///
    /// The source is read fully into memory before anything is parsed, so a
    /// read failure never leads to a partial write.
    ///
    /// # Errors
    ///
    /// - `IngestionError::SourceReadFailure` if the source fails or exceeds
    ///   `max_content_bytes`
    /// - `IngestionError::PersistenceFailure` if the store fails
    #[instrument(skip(self, source))]
    pub async fn run<S>(&self, source: S) -> Result<IngestionReport>
    where
        S: AsyncRead + Unpin + Send,
    {
        let content = self.read_source(source).await?;
        self.ingest(&content).await
    }

    /// Ingest content that is already buffered as text
    ///
    /// # Errors
    ///
    /// Returns `IngestionError::PersistenceFailure` if the store fails
    pub async fn run_text(&self, content: &str) -> Result<IngestionReport> {
        self.ingest(content.as_bytes()).await
    }

    async fn ingest(&self, content: &[u8]) -> Result<IngestionReport> {
        let (batch, mut report) = Self::collect_batch(content);

        info!(
            lines_read = report.lines_read,
            accepted = batch.len(),
            malformed_lines = report.malformed_lines,
            undecodable_lines = report.undecodable_lines,
            invalid_identifiers = report.invalid_identifiers,
            "Parsed customer file"
        );

        report.persisted = self.persist(batch).await?;

        info!(persisted = report.persisted, "Ingestion run completed");
        Ok(report)
    }

    /// Parse and validate, without touching the store
    pub fn collect_batch<C>(content: &C) -> (Batch, IngestionReport)
    where
        C: AsRef<[u8]> + ?Sized,
    {
        let mut batch = Batch::new();
        let mut report = IngestionReport::default();

        for parsed in parser::parse(content) {
            report.lines_read += 1;

            match parsed {
                ParsedLine::Record { line, record } => match record.validate() {
                    Ok(valid) => batch.push(valid),
                    Err(_) => report.reject(Rejection::InvalidIdentifier { line }),
                },
                ParsedLine::Rejected(rejection) => report.reject(rejection),
            }
        }

        (batch, report)
    }

    /// Get the service configuration
    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    async fn read_source<S>(&self, source: S) -> Result<Vec<u8>>
    where
        S: AsyncRead + Unpin + Send,
    {
        let max = self.config.max_content_bytes;
        let mut buffer = Vec::new();

        // One byte past the limit is enough to detect oversized content
        source
            .take(max as u64 + 1)
            .read_to_end(&mut buffer)
            .await?;

        if buffer.len() > max {
            return Err(IngestionError::source_read_failure(format!(
                "Content exceeds maximum of {} bytes",
                max
            )));
        }

        Ok(buffer)
    }

    /// Write the batch through one store session, in order
    ///
    /// The session is dropped, releasing its handle, on every return path.
    async fn persist(&self, batch: Batch) -> Result<usize> {
        let mut session = self.repository.open_session().await.map_err(|cause| {
            error!(error = %cause, "Failed to open record store session");
            IngestionError::persistence_failure(0, cause)
        })?;

        let mut persisted = 0;
        for record in &batch {
            if let Err(cause) = session.persist(record).await {
                error!(
                    persisted,
                    remaining = batch.len() - persisted,
                    error = %cause,
                    "Failed to persist record"
                );
                return Err(IngestionError::persistence_failure(persisted, cause));
            }
            persisted += 1;
        }

        Ok(persisted)
    }
}

impl<R> IngestionServicePort for IngestionService<R>
where
    R: RecordStore,
{
    fn run<S>(&self, source: S) -> impl Future<Output = Result<IngestionReport>> + Send
    where
        S: AsyncRead + Unpin + Send,
    {
        IngestionService::run(self, source)
    }

    fn run_text(&self, content: &str) -> impl Future<Output = Result<IngestionReport>> + Send {
        IngestionService::run_text(self, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{CandidateRecord, StoreError, ValidatedRecord};
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    const HEADER: &str = "NATIONAL_ID CLASSIFICATION COMPLETENESS LAST_PURCHASE_DATE AVERAGE_TICKET LAST_PURCHASE_TICKET MOST_FREQUENT_STORE LAST_PURCHASE_STORE";
    const VALID_LINE: &str = "111.444.777-30 0 0 2013-05-13 186,58 186,58 79.379.491/0008-50 79.379.491/0008-50";
    const INVALID_LINE: &str = "111.444.777-35 0 0 2013-05-13 186,58 186,58 79.379.491/0008-50 79.379.491/0008-50";

    // In-memory record store for testing
    #[derive(Clone, Default)]
    struct InMemoryStore {
        rows: Arc<Mutex<Vec<CandidateRecord>>>,
        attempts: Arc<AtomicUsize>,
        open_sessions: Arc<AtomicUsize>,
        sessions_opened: Arc<AtomicUsize>,
        fail_on_attempt: Option<usize>,
        unavailable: bool,
    }

    impl InMemoryStore {
        fn new() -> Self {
            Self::default()
        }

        fn failing_on(attempt: usize) -> Self {
            Self {
                fail_on_attempt: Some(attempt),
                ..Self::default()
            }
        }

        fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        fn rows(&self) -> Vec<CandidateRecord> {
            self.rows.lock().unwrap().clone()
        }
    }

    struct InMemorySession {
        store: InMemoryStore,
    }

    impl Drop for InMemorySession {
        fn drop(&mut self) {
            self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl RecordStore for InMemoryStore {
        type Session = InMemorySession;

        fn open_session(
            &self,
        ) -> impl Future<Output = std::result::Result<Self::Session, StoreError>> + Send {
            let store = self.clone();

            async move {
                if store.unavailable {
                    return Err(StoreError::unavailable("connection refused"));
                }
                store.open_sessions.fetch_add(1, Ordering::SeqCst);
                store.sessions_opened.fetch_add(1, Ordering::SeqCst);
                Ok(InMemorySession { store })
            }
        }
    }

    impl StoreSession for InMemorySession {
        fn persist(
            &mut self,
            record: &ValidatedRecord,
        ) -> impl Future<Output = std::result::Result<(), StoreError>> + Send {
            let attempt = self.store.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fail = self.store.fail_on_attempt == Some(attempt);
            let row = (**record).clone();
            let rows = self.store.rows.clone();

            async move {
                if fail {
                    return Err(StoreError::write_rejected("insert failed"));
                }
                rows.lock().unwrap().push(row);
                Ok(())
            }
        }
    }

    // Reader that always fails
    struct BrokenReader;

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "upload aborted")))
        }
    }

    fn line_with_id(id: &str) -> String {
        format!("{} 1 0 2020-01-01 10,00 12,00 store-a store-b", id)
    }

    #[tokio::test]
    async fn test_run_persists_only_valid_records() {
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let content = format!("{HEADER}\n{VALID_LINE}\n{INVALID_LINE}\n");
        let report = service.run(content.as_bytes()).await.unwrap();

        assert_eq!(report.persisted, 1);
        assert_eq!(report.lines_read, 2);
        assert_eq!(report.invalid_identifiers, 1);
        assert_eq!(report.malformed_lines, 0);

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        let expected: Vec<&str> = VALID_LINE.split_whitespace().collect();
        assert_eq!(rows[0].tokens().to_vec(), expected);
    }

    #[tokio::test]
    async fn test_run_drops_seven_token_lines() {
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let content = format!("{HEADER}\n{VALID_LINE}\n111.444.777-30 0 0 2013-05-13 1 2 store\n");
        let report = service.run_text(&content).await.unwrap();

        assert_eq!(report.persisted, 1);
        assert_eq!(report.malformed_lines, 1);
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_run_preserves_input_order() {
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let content = format!(
            "{HEADER}\n{}\n{}\n{}\n",
            line_with_id("52998224729"),
            line_with_id("11144477736"),
            line_with_id("11144477730"),
        );
        let report = service.run_text(&content).await.unwrap();

        assert_eq!(report.persisted, 2);
        let ids: Vec<String> = store.rows().into_iter().map(|r| r.national_id).collect();
        assert_eq!(ids, ["52998224729", "11144477730"]);
    }

    #[tokio::test]
    async fn test_run_twice_inserts_duplicates() {
        // Persistence is not idempotent: the same file ingested twice is stored twice
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());
        let content = format!("{HEADER}\n{VALID_LINE}\n");

        service.run_text(&content).await.unwrap();
        service.run_text(&content).await.unwrap();

        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], rows[1]);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_earlier_writes() {
        let store = InMemoryStore::failing_on(2);
        let service = IngestionService::with_repository(store.clone());

        let content = format!(
            "{HEADER}\n{}\n{}\n{}\n",
            line_with_id("11144477730"),
            line_with_id("52998224729"),
            line_with_id("111.444.777-30"),
        );
        let err = service.run_text(&content).await.unwrap_err();

        assert!(matches!(
            err,
            IngestionError::PersistenceFailure {
                persisted: 1,
                cause: StoreError::WriteRejected(_)
            }
        ));

        // First record written, second failed, third never attempted
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].national_id, "11144477730");
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(store.open_sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_persistence_failure() {
        let store = InMemoryStore::unavailable();
        let service = IngestionService::with_repository(store.clone());

        let err = service
            .run_text(&format!("{HEADER}\n{VALID_LINE}\n"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestionError::PersistenceFailure {
                persisted: 0,
                cause: StoreError::Unavailable(_)
            }
        ));
        assert_eq!(store.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_read_failure_skips_persistence() {
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let err = service.run(BrokenReader).await.unwrap_err();

        assert!(matches!(err, IngestionError::SourceReadFailure(_)));
        assert_eq!(store.sessions_opened.load(Ordering::SeqCst), 0);
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_dropped() {
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let mut content = format!("{HEADER}\n").into_bytes();
        content.extend_from_slice(&[0xff, 0xfe, b'\n']);
        content.extend_from_slice(format!("{VALID_LINE}\n").as_bytes());

        let report = service.run(content.as_slice()).await.unwrap();

        assert_eq!(report.lines_read, 2);
        assert_eq!(report.undecodable_lines, 1);
        assert_eq!(report.persisted, 1);
        assert_eq!(store.rows()[0].national_id, "111.444.777-30");
    }

    #[tokio::test]
    async fn test_latin1_header_is_skipped() {
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let mut content = b"CPF PRIVATE INCOMPLETO LOJA_MAIS_FREQU\xcaNTADA\n".to_vec();
        content.extend_from_slice(b"111.444.777-30 0 0 2013-05-13 186,58 186,58 a b\n");

        let report = service.run(content.as_slice()).await.unwrap();

        assert_eq!(report.persisted, 1);
        assert_eq!(report.undecodable_lines, 0);
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].last_purchase_store, "b");
    }

    #[tokio::test]
    async fn test_oversized_content_is_rejected() {
        let store = InMemoryStore::new();
        let config = IngestionConfig {
            max_content_bytes: 16,
        };
        let service = IngestionService::new(store.clone(), config);

        let content = format!("{HEADER}\n{VALID_LINE}\n");
        let err = service.run(content.as_bytes()).await.unwrap_err();

        assert!(matches!(err, IngestionError::SourceReadFailure(ref msg) if msg.contains("16 bytes")));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_content_at_limit_is_accepted() {
        let content = format!("{HEADER}\n{VALID_LINE}");
        let store = InMemoryStore::new();
        let config = IngestionConfig {
            max_content_bytes: content.len(),
        };
        let service = IngestionService::new(store.clone(), config);

        let report = service.run(content.as_bytes()).await.unwrap();
        assert_eq!(report.persisted, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_still_opens_one_session() {
        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let report = service.run_text(HEADER).await.unwrap();

        assert_eq!(report, IngestionReport::default());
        assert_eq!(store.sessions_opened.load(Ordering::SeqCst), 1);
        assert_eq!(store.open_sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_service_port_delegates() {
        async fn ingest<P: IngestionServicePort>(port: &P, content: &str) -> Result<IngestionReport> {
            port.run_text(content).await
        }

        let store = InMemoryStore::new();
        let service = IngestionService::with_repository(store.clone());

        let report = ingest(&service, &format!("{HEADER}\n{VALID_LINE}\n")).await.unwrap();
        assert_eq!(report.persisted, 1);
    }

    #[test]
    fn test_collect_batch_counts() {
        let content = format!("{HEADER}\n{VALID_LINE}\nshort line\n{INVALID_LINE}\n\n");
        let (batch, report) = IngestionService::<InMemoryStore>::collect_batch(&content);

        assert_eq!(batch.len(), 1);
        assert_eq!(
            report,
            IngestionReport {
                lines_read: 4,
                malformed_lines: 2,
                undecodable_lines: 0,
                invalid_identifiers: 1,
                persisted: 0,
            }
        );
    }

    #[test]
    fn test_default_config() {
        assert_eq!(IngestionConfig::default().max_content_bytes, 10 * 1024 * 1024);
    }
}
