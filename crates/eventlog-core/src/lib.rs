//! Event log core: the event model and storage abstractions.
//!
//! This crate defines the types shared by the store, its storage adapters and
//! the HTTP surface. It contains no infrastructure code.

pub mod error;
pub mod event;
pub mod filter;
pub mod id;
pub mod page;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use event::{EntityId, Event, EventKey, LatestKey, NewEvent, TenantId};
pub use filter::{EventFilter, Predicate};
pub use id::{EventId, IdGenerator, TimeUuidGenerator};
pub use page::{SortOrder, TimePageLink};
pub use repository::RecordRepository;
