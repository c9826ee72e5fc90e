//! Core booking components: inventory, coordination, processing, dispatch and metrics.

pub mod batch;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod outcome;
pub mod processor;

pub use batch::{chunk_batches, Batch};
pub use coordinator::BookingCoordinator;
pub use dispatcher::{BatchSubmitter, PendingWork, PoolStats, WorkerPool};
pub use error::{AppResult, BookingError, EngineError};
pub use inventory::{Inventory, Ticket, TicketId, TicketStatus, User, UserId};
pub use metrics::{BookingMetrics, MetricsSnapshot};
pub use outcome::{
    BookingEvent, BookingOutcome, ChannelOutcomeSink, InMemoryOutcomeSink, NoopOutcomeSink,
    OutcomeSink, TracingOutcomeSink,
};
pub use processor::BatchProcessor;
