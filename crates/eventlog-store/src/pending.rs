//! Handle for a save running on a background task.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use eventlog_core::error::StoreError;
use eventlog_core::event::Event;
use eventlog_core::id::EventId;
use tokio::task::JoinHandle;

/// A save that has been handed to a worker.
///
/// Awaiting it yields what `EventStore::save` would have returned. Dropping
/// it detaches the task: the write still runs to completion.
#[derive(Debug)]
pub struct PendingSave {
    event_id: EventId,
    state: State,
}

#[derive(Debug)]
enum State {
    Running(JoinHandle<Result<Event, StoreError>>),
    /// The write never started. Taken on first poll.
    Rejected(Option<StoreError>),
}

impl PendingSave {
    pub(crate) fn new(event_id: EventId, handle: JoinHandle<Result<Event, StoreError>>) -> Self {
        Self {
            event_id,
            state: State::Running(handle),
        }
    }

    pub(crate) fn rejected(event_id: EventId, error: StoreError) -> Self {
        Self {
            event_id,
            state: State::Rejected(Some(error)),
        }
    }

    /// Identifier assigned to the event before it was dispatched.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Whether the background write has finished, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Running(handle) => handle.is_finished(),
            State::Rejected(_) => true,
        }
    }
}

impl Future for PendingSave {
    type Output = Result<Event, StoreError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            State::Running(handle) => match Pin::new(handle).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(err)) => {
                    Poll::Ready(Err(StoreError::TaskAborted(err.to_string())))
                }
                Poll::Pending => Poll::Pending,
            },
            State::Rejected(error) => Poll::Ready(Err(error.take().unwrap_or_else(|| {
                StoreError::TaskAborted("save polled after completion".into())
            }))),
        }
    }
}
