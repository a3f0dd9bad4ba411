//! Shared test doubles for the event log crates.

mod id;
mod repository;

pub use id::SteppingIdGenerator;
pub use repository::{FailingRecordRepository, InMemoryRecordRepository};
