//! # Prometheus Booking
//!
//! An in-memory, concurrent ticket-reservation engine.
//!
//! Many producers generate batches of candidate ticket ids; a fixed pool of
//! worker threads drains them from a bounded queue and books each ticket
//! through a single exclusive coordinator, so no ticket is ever sold twice.
//! Outcomes are tallied in lock-free counters and read once the pool has
//! drained.
//!
//! ## Components
//!
//! - **Inventory**: tickets and users keyed by dense 1-based ids
//! - **BookingCoordinator**: the one critical section that flips a ticket to
//!   booked and appends it to the user's history
//! - **BatchProcessor**: attempts every ticket of a batch, never retrying
//! - **WorkerPool**: bounded queue with backpressure plus dedicated worker threads
//! - **BookingMetrics**: atomic success/failure counters
//!
//! ## Example
//!
//! ```rust,no_run
//! use prometheus_booking::config::EngineConfig;
//! use prometheus_booking::engine::BookingEngine;
//!
//! let engine = BookingEngine::new(
//!     EngineConfig::new()
//!         .with_ticket_count(1_000)
//!         .with_user_count(50)
//!         .with_batch_size(5)
//!         .with_worker_count(4),
//! )?;
//!
//! let report = engine.simulate()?;
//! assert_eq!(report.metrics.total(), report.attempts);
//! # Ok::<(), prometheus_booking::core::EngineError>(())
//! ```
//!
//! For complete scenarios, see `tests/booking_engine_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core booking components.
pub mod core;
/// Configuration models for the engine.
pub mod config;
/// Engine wiring and simulation runs.
pub mod engine;
/// Runtime adapters for producer tasks.
pub mod runtime;
/// Shared utilities.
pub mod util;
