//! Test id generator: deterministic `IdGenerator` for tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use eventlog_core::id::{EventId, IdGenerator};
use uuid::Uuid;

/// Hands out ids whose embedded timestamps start at a fixed instant and move
/// forward by `step` on every call.
///
/// The low bits carry the call counter, so ids stay strictly increasing even
/// with a zero step.
#[derive(Debug)]
pub struct SteppingIdGenerator {
    start: DateTime<Utc>,
    step: Duration,
    issued: Mutex<u32>,
}

impl SteppingIdGenerator {
    /// Creates a generator starting at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step,
            issued: Mutex::new(0),
        }
    }

    /// Creation time of the `n`th id (zero-based).
    #[must_use]
    pub fn time_of(&self, n: u32) -> DateTime<Utc> {
        self.start + self.step * i32::try_from(n).unwrap_or(i32::MAX)
    }
}

impl Default for SteppingIdGenerator {
    /// Starts at 2026-01-15T10:00:00Z and steps one second per id.
    fn default() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            Duration::seconds(1),
        )
    }
}

impl IdGenerator for SteppingIdGenerator {
    fn next_id(&self) -> EventId {
        let mut issued = self.issued.lock().unwrap();
        let n = *issued;
        *issued += 1;
        let base = EventId::lower_bound(self.time_of(n)).as_uuid().as_u128();
        EventId::from_uuid(Uuid::from_u128(base | u128::from(n)))
    }
}
