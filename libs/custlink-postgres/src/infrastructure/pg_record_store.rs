//! Postgres Record Store Implementation
//!
//! This module implements the `RecordStore` port using a `sqlx` Postgres pool.
//! It handles all SQL operations and converts sqlx errors to domain errors.

use std::future::Future;
use std::time::Duration;

use custlink_domain::{
    ingestion::{StoreError, ValidatedRecord},
    ports::{RecordStore, StoreSession},
};
use sqlx::{
    pool::PoolConnection,
    postgres::{PgPool, PgPoolOptions},
    Postgres,
};
use tracing::{debug, error, info, instrument};

use crate::config::DatabaseConfig;

/// Schema the adapter writes to
///
/// Every column is free text: values are stored exactly as they appeared in
/// the uploaded file. There is no unique constraint on
/// `national_id`.
pub const CUSTOMER_RECORDS_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS customer_records (
    id BIGSERIAL PRIMARY KEY,
    national_id TEXT NOT NULL,
    classification TEXT NOT NULL,
    completeness TEXT NOT NULL,
    last_purchase_date TEXT NOT NULL,
    average_ticket TEXT NOT NULL,
    last_purchase_ticket TEXT NOT NULL,
    most_frequent_store TEXT NOT NULL,
    last_purchase_store TEXT NOT NULL
)
"#;

const INSERT_CUSTOMER_RECORD: &str = r#"
INSERT INTO customer_records (
    national_id, classification, completeness, last_purchase_date,
    average_ticket, last_purchase_ticket, most_frequent_store, last_purchase_store
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

/// Postgres-based implementation of the RecordStore port
///
/// Each ingestion run gets its own pooled connection through
/// [`RecordStore::open_session`]; the connection returns to the pool when
/// the session is dropped.
///
/// ## Writes
///
/// One `INSERT` per record, outside any transaction, so rows written before a
/// failing insert stay written.
///
/// ## Error Handling
///
/// Connection and pool errors become `StoreError::Unavailable`, errors
/// reported by the database become `StoreError::WriteRejected`.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a connection pool from the given settings
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use custlink_postgres::{DatabaseConfig, PgRecordStore};
    ///
    /// # async fn example() -> Result<(), sqlx::Error> {
    /// let config = DatabaseConfig::new("postgres://postgres@localhost/custlink");
    /// let store = PgRecordStore::connect(&config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );

        Ok(Self::new(pool))
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A pooled connection held for the duration of one ingestion run
pub struct PgSession {
    conn: PoolConnection<Postgres>,
}

impl RecordStore for PgRecordStore {
    type Session = PgSession;

    #[instrument(skip(self))]
    fn open_session(&self) -> impl Future<Output = Result<PgSession, StoreError>> + Send {
        let pool = self.pool.clone();

        async move {
            match pool.acquire().await {
                Ok(conn) => {
                    debug!("Acquired database connection");
                    Ok(PgSession { conn })
                }
                Err(err) => {
                    error!(error = ?err, "Failed to acquire database connection");
                    Err(map_sqlx_error(err))
                }
            }
        }
    }
}

impl StoreSession for PgSession {
    #[instrument(skip(self, record), fields(national_id = %record.national_id()))]
    fn persist(
        &mut self,
        record: &ValidatedRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let query = sqlx::query(INSERT_CUSTOMER_RECORD)
            .bind(record.national_id.clone())
            .bind(record.classification.clone())
            .bind(record.completeness.clone())
            .bind(record.last_purchase_date.clone())
            .bind(record.average_ticket.clone())
            .bind(record.last_purchase_ticket.clone())
            .bind(record.most_frequent_store.clone())
            .bind(record.last_purchase_store.clone());
        let conn = &mut self.conn;

        async move {
            match query.execute(&mut **conn).await {
                Ok(_) => {
                    debug!("Inserted customer record");
                    Ok(())
                }
                Err(err) => {
                    error!(error = ?err, "Failed to insert customer record");
                    Err(map_sqlx_error(err))
                }
            }
        }
    }
}

/// Translate a sqlx error into the domain's store error
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::write_rejected(db_err.to_string()),
        sqlx::Error::Encode(_) | sqlx::Error::ColumnNotFound(_) | sqlx::Error::TypeNotFound { .. } => {
            StoreError::write_rejected(err.to_string())
        }
        other => StoreError::unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custlink_domain::CandidateRecord;

    fn validated(id: &str) -> ValidatedRecord {
        CandidateRecord::from_tokens(&[id, "1", "0", "2013-05-13", "186,58", "0,00", "store-a", "NULL"])
            .expect("eight tokens")
            .validate()
            .expect("valid national id")
    }

    async fn create_table(pool: &PgPool) -> sqlx::Result<()> {
        sqlx::query(CUSTOMER_RECORDS_DDL).execute(pool).await?;
        Ok(())
    }

    async fn stored_ids(pool: &PgPool) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar("SELECT national_id FROM customer_records ORDER BY id")
            .fetch_all(pool)
            .await
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::Protocol("unexpected message".into())),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_encode_errors_are_rejections() {
        let err = sqlx::Error::Encode("value too long".into());
        assert!(matches!(map_sqlx_error(err), StoreError::WriteRejected(_)));
    }

    #[sqlx::test]
    #[ignore] // Requires DATABASE_URL
    async fn test_persist_writes_raw_fields(pool: PgPool) -> sqlx::Result<()> {
        create_table(&pool).await?;
        let store = PgRecordStore::new(pool.clone());

        let mut session = store.open_session().await.unwrap();
        session.persist(&validated("111.444.777-30")).await.unwrap();
        drop(session);

        let row: (String, String, String) = sqlx::query_as(
            "SELECT national_id, average_ticket, last_purchase_store FROM customer_records",
        )
        .fetch_one(&pool)
        .await?;

        assert_eq!(row, ("111.444.777-30".into(), "186,58".into(), "NULL".into()));
        Ok(())
    }

    #[sqlx::test]
    #[ignore] // Requires DATABASE_URL
    async fn test_duplicates_are_accepted(pool: PgPool) -> sqlx::Result<()> {
        create_table(&pool).await?;
        let store = PgRecordStore::new(pool.clone());
        let record = validated("11144477730");

        let mut session = store.open_session().await.unwrap();
        session.persist(&record).await.unwrap();
        session.persist(&record).await.unwrap();
        drop(session);

        assert_eq!(stored_ids(&pool).await?, ["11144477730", "11144477730"]);
        Ok(())
    }

    #[sqlx::test]
    #[ignore] // Requires DATABASE_URL
    async fn test_earlier_writes_survive_failure(pool: PgPool) -> sqlx::Result<()> {
        create_table(&pool).await?;
        let store = PgRecordStore::new(pool.clone());

        let mut session = store.open_session().await.unwrap();
        session.persist(&validated("11144477730")).await.unwrap();

        sqlx::query("ALTER TABLE customer_records ADD CONSTRAINT short_ids CHECK (length(national_id) < 12)")
            .execute(&pool)
            .await?;

        let err = session.persist(&validated("111.444.777-30")).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected(_)));
        drop(session);

        assert_eq!(stored_ids(&pool).await?, ["11144477730"]);
        Ok(())
    }

    #[sqlx::test]
    #[ignore] // Requires DATABASE_URL
    async fn test_session_returns_connection_to_pool(pool: PgPool) -> sqlx::Result<()> {
        let store = PgRecordStore::new(pool.clone());
        let idle_before = pool.num_idle();

        let session = store.open_session().await.unwrap();
        drop(session);

        // Release happens in the background; give it a moment
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(pool.num_idle() >= idle_before);
        Ok(())
    }
}
