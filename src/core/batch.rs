//! Batches of candidate tickets submitted together.

use serde::{Deserialize, Serialize};

use crate::core::{TicketId, UserId};

/// A user's ordered list of tickets to attempt.
///
/// Moved into the queue by one producer and out of it by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// User that produced the batch.
    pub owner: UserId,
    /// Candidate ticket ids, attempted in order.
    pub ticket_ids: Vec<TicketId>,
}

impl Batch {
    /// Create a batch.
    #[must_use]
    pub const fn new(owner: UserId, ticket_ids: Vec<TicketId>) -> Self {
        Self { owner, ticket_ids }
    }

    /// Number of attempts in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ticket_ids.len()
    }

    /// Whether the batch has no attempts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticket_ids.is_empty()
    }
}

/// Split `ticket_ids` into batches of at most `batch_size`, keeping order.
///
/// A `batch_size` of zero is treated as one.
#[must_use]
pub fn chunk_batches(owner: UserId, ticket_ids: &[TicketId], batch_size: usize) -> Vec<Batch> {
    ticket_ids
        .chunks(batch_size.max(1))
        .map(|chunk| Batch::new(owner, chunk.to_vec()))
        .collect()
}
