//! Time-ordered event identifiers.
//!
//! Event ids are version 7 UUIDs: the top 48 bits hold the creation time in
//! unix milliseconds, so byte order is creation order. Time-range queries are
//! expressed as id bounds built from the same layout.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_UNIX_MILLIS: u64 = (1 << 48) - 1;
const VERSION_BITS: u128 = 0x7 << 76;
const VARIANT_BITS: u128 = 0b10 << 62;
const RAND_A_BITS: u128 = 0xFFF << 64;
const RAND_B_BITS: u128 = (1 << 62) - 1;

/// Unique, time-ordered event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// The smallest id that can carry the timestamp `time`.
    ///
    /// Times before the unix epoch clamp to the epoch.
    #[must_use]
    pub fn lower_bound(time: DateTime<Utc>) -> Self {
        Self(Uuid::from_u128((unix_millis(time) << 80) | VERSION_BITS | VARIANT_BITS))
    }

    /// The largest id that can carry the timestamp `time`.
    #[must_use]
    pub fn upper_bound(time: DateTime<Utc>) -> Self {
        let lower = Self::lower_bound(time).0.as_u128();
        Self(Uuid::from_u128(lower | RAND_A_BITS | RAND_B_BITS))
    }

    /// Creation time embedded in the id, at millisecond precision.
    ///
    /// Returns `None` for UUIDs that carry no timestamp (e.g. v4).
    #[must_use]
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        let (secs, nanos) = self.0.get_timestamp()?.to_unix();
        DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
    }
}

fn unix_millis(time: DateTime<Utc>) -> u128 {
    let millis = u64::try_from(time.timestamp_millis()).unwrap_or(0);
    u128::from(millis.min(MAX_UNIX_MILLIS))
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Source of new event identifiers.
///
/// Implementations must hand out ids that increase with time.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Returns a fresh identifier.
    fn next_id(&self) -> EventId;
}

/// Production generator backed by `Uuid::now_v7`, which is monotonic within
/// the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeUuidGenerator;

impl IdGenerator for TimeUuidGenerator {
    fn next_id(&self) -> EventId {
        EventId(Uuid::now_v7())
    }
}
