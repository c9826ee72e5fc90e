//! Per-attempt outcome events and the sinks that receive them.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{BookingError, TicketId, UserId};
use crate::util::clock::now_ms;

/// Result kind of one booking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingOutcome {
    /// The ticket was booked for the acting user.
    Booked,
    /// The ticket had already been booked.
    AlreadyBooked,
    /// The ticket identifier does not exist.
    TicketNotFound,
    /// The acting user does not exist.
    UserNotFound,
}

impl BookingOutcome {
    /// Whether the attempt booked a ticket.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Booked)
    }
}

impl From<&Result<(), BookingError>> for BookingOutcome {
    fn from(result: &Result<(), BookingError>) -> Self {
        match result {
            Ok(()) => Self::Booked,
            Err(BookingError::AlreadyBooked(_)) => Self::AlreadyBooked,
            Err(BookingError::TicketNotFound(_)) => Self::TicketNotFound,
            Err(BookingError::UserNotFound(_)) => Self::UserNotFound,
        }
    }
}

/// Structured record of one booking attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
    /// Acting user.
    pub user_id: UserId,
    /// Candidate ticket.
    pub ticket_id: TicketId,
    /// What happened.
    pub outcome: BookingOutcome,
    /// Timestamp in milliseconds since epoch.
    pub at_ms: u128,
}

impl BookingEvent {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn new(user_id: UserId, ticket_id: TicketId, outcome: BookingOutcome) -> Self {
        Self {
            user_id,
            ticket_id,
            outcome,
            at_ms: now_ms(),
        }
    }
}

/// Receiver for booking outcome events.
///
/// Called from every worker thread concurrently, so implementations must be
/// cheap and must not block for long.
pub trait OutcomeSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: BookingEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOutcomeSink;

impl OutcomeSink for NoopOutcomeSink {
    fn record(&self, _event: BookingEvent) {}
}

/// Sink that writes each event as a `debug` tracing line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOutcomeSink;

impl OutcomeSink for TracingOutcomeSink {
    fn record(&self, event: BookingEvent) {
        debug!(
            user_id = event.user_id,
            ticket_id = event.ticket_id,
            outcome = ?event.outcome,
            "Booking attempt"
        );
    }
}

/// In-memory sink with a bounded buffer, for testing and dev.
#[derive(Debug)]
pub struct InMemoryOutcomeSink {
    events: Mutex<VecDeque<BookingEvent>>,
    max_events: usize,
}

impl InMemoryOutcomeSink {
    /// Create a sink that keeps at most `max_events`, dropping the oldest first.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl OutcomeSink for InMemoryOutcomeSink {
    fn record(&self, event: BookingEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Sink that forwards events over a channel to an external consumer.
///
/// Events are dropped silently once the receiving side is gone.
#[derive(Debug, Clone)]
pub struct ChannelOutcomeSink {
    tx: crossbeam_channel::Sender<BookingEvent>,
}

impl ChannelOutcomeSink {
    /// Create a sink plus the receiver its events arrive on.
    #[must_use]
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<BookingEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl OutcomeSink for ChannelOutcomeSink {
    fn record(&self, event: BookingEvent) {
        let _ = self.tx.send(event);
    }
}
