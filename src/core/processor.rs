//! Batch processor: drives each candidate ticket through the coordinator.

use std::sync::Arc;

use crate::core::{
    BookingCoordinator, BookingEvent, BookingMetrics, BookingOutcome, NoopOutcomeSink,
    OutcomeSink, TicketId, UserId,
};

/// Attempts every ticket of a batch and tallies each outcome.
#[derive(Clone)]
pub struct BatchProcessor {
    coordinator: Arc<BookingCoordinator>,
    metrics: Arc<BookingMetrics>,
    sink: Arc<dyn OutcomeSink>,
}

impl BatchProcessor {
    /// Create a processor that reports outcomes to `sink`.
    #[must_use]
    pub fn new(
        coordinator: Arc<BookingCoordinator>,
        metrics: Arc<BookingMetrics>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            coordinator,
            metrics,
            sink,
        }
    }

    /// Create a processor that discards outcome events.
    #[must_use]
    pub fn without_events(
        coordinator: Arc<BookingCoordinator>,
        metrics: Arc<BookingMetrics>,
    ) -> Self {
        Self::new(coordinator, metrics, Arc::new(NoopOutcomeSink))
    }

    /// Attempt each ticket in order on behalf of `user_id`.
    ///
    /// Failures are counted, never retried, and never stop the batch.
    pub fn process_batch(&self, user_id: UserId, ticket_ids: &[TicketId]) {
        for &ticket_id in ticket_ids {
            let result = self.coordinator.book_ticket(user_id, ticket_id);
            let outcome = BookingOutcome::from(&result);
            if outcome.is_success() {
                self.metrics.record_success();
            } else {
                self.metrics.record_failure();
            }
            self.sink.record(BookingEvent::new(user_id, ticket_id, outcome));
        }
    }

    /// Shared coordinator.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<BookingCoordinator> {
        &self.coordinator
    }

    /// Shared metrics.
    #[must_use]
    pub fn metrics(&self) -> &Arc<BookingMetrics> {
        &self.metrics
    }
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}
