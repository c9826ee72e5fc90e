//! Error types for booking and engine operations.

use thiserror::Error;

use crate::core::{TicketId, UserId};

/// Outcome-level errors produced by a single booking attempt.
///
/// None of these are fatal: the batch processor records them as failures and
/// moves on to the next candidate ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Ticket identifier is outside the populated range.
    #[error("ticket not found: {0}")]
    TicketNotFound(TicketId),
    /// User identifier is outside the populated range.
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    /// Ticket was already booked by an earlier attempt.
    #[error("ticket already booked: {0}")]
    AlreadyBooked(TicketId),
}

impl BookingError {
    /// Whether this error belongs to the not-found category (a caller bug, not a race).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::TicketNotFound(_) | Self::UserNotFound(_))
    }
}

/// Errors produced while configuring or driving the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration validation failed; raised before any work is dispatched.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The producer runtime could not be created.
    #[error("runtime error: {0}")]
    Runtime(String),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
    /// The batch queue has been closed; no more batches are accepted.
    #[error("batch queue is closed")]
    QueueClosed,
    /// A worker thread panicked while processing batches.
    ///
    /// `unprocessed` counts accepted batches no worker was left to process.
    #[error("worker {worker_id} panicked ({unprocessed} batches unprocessed)")]
    WorkerPanicked {
        /// First worker found panicked on join.
        worker_id: usize,
        /// Accepted batches that were never processed.
        unprocessed: usize,
    },
    /// A producer task failed before enqueuing all of its batches.
    #[error("producer failed: {0}")]
    ProducerFailed(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
