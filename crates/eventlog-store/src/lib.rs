//! Event store: identifier and idempotency policy over a record repository.
//!
//! The store is a stateless coordinator: it completes the fields a caller
//! may leave unset, composes query filters, and delegates all physical
//! storage to a `RecordRepository` adapter.

pub mod event_store;
pub mod pending;

pub use event_store::EventStore;
pub use pending::PendingSave;
