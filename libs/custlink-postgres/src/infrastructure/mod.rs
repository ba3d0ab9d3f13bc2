//! Infrastructure adapters

mod pg_record_store;

pub use pg_record_store::{PgRecordStore, PgSession, CUSTOMER_RECORDS_DDL};
