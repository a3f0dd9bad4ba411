//! `PostgreSQL` storage adapter for the event log.

pub mod pg_record_repository;
pub mod schema;

pub use pg_record_repository::PgRecordRepository;
pub use schema::MIGRATOR;
