//! Time-ordered page requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::Predicate;
use crate::id::EventId;

/// Direction of an id-ordered scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

impl SortOrder {
    /// `Ascending` when `asc` is set, `Descending` otherwise.
    #[must_use]
    pub fn from_ascending(asc: bool) -> Self {
        if asc { Self::Ascending } else { Self::Descending }
    }
}

/// A single page of an id-ordered, optionally time-bounded scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePageLink {
    /// Maximum number of events returned.
    pub limit: usize,
    /// Inclusive lower bound on creation time.
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time.
    pub end_time: Option<DateTime<Utc>>,
    /// Oldest first when set, newest first otherwise.
    pub asc_order: bool,
    /// Exclusive cursor: the last id of the previous page.
    pub id_offset: Option<EventId>,
}

impl TimePageLink {
    /// An unbounded, newest-first page of `limit` events.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            start_time: None,
            end_time: None,
            asc_order: false,
            id_offset: None,
        }
    }

    /// Restricts the page to events created within `[start, end]`.
    #[must_use]
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn ascending(mut self, asc_order: bool) -> Self {
        self.asc_order = asc_order;
        self
    }

    /// Continues after `id_offset` in the page's direction.
    #[must_use]
    pub fn after(mut self, id_offset: EventId) -> Self {
        self.id_offset = Some(id_offset);
        self
    }

    /// Ordering requested by this page.
    #[must_use]
    pub fn sort_order(&self) -> SortOrder {
        SortOrder::from_ascending(self.asc_order)
    }

    /// Id predicates expressing the time bounds and the cursor.
    #[must_use]
    pub fn id_predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(start) = self.start_time {
            predicates.push(Predicate::IdAtLeast(EventId::lower_bound(start)));
        }
        if let Some(end) = self.end_time {
            predicates.push(Predicate::IdAtMost(EventId::upper_bound(end)));
        }
        if let Some(offset) = self.id_offset {
            predicates.push(if self.asc_order {
                Predicate::IdAfter(offset)
            } else {
                Predicate::IdBefore(offset)
            });
        }
        predicates
    }
}
