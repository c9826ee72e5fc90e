//! Booking engine: wires inventory, coordinator, processor and worker pool into runs.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::core::{
    AppResult, Batch, BatchProcessor, BatchSubmitter, BookingCoordinator, BookingMetrics,
    EngineError, Inventory, MetricsSnapshot, OutcomeSink, TicketId, TracingOutcomeSink, UserId,
    WorkerPool,
};
use crate::runtime::ProducerRuntime;
use crate::util::random::{seeded_factory, RandomSource, RandomSourceFactory};
use crate::util::telemetry::init_tracing;

/// Summary of one engine run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Outcome counts recorded during this run.
    pub metrics: MetricsSnapshot,
    /// Batches processed during this run.
    pub batches: u64,
    /// Attempts issued by producers during this run.
    pub attempts: u64,
    /// Tickets booked in the inventory once the run completed (cumulative).
    pub booked_tickets: usize,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// In-memory booking engine.
///
/// The inventory is built in [`BookingEngine::new`] before any work can be
/// dispatched and keeps its shape for the engine's lifetime. Repeated runs see
/// the tickets booked by earlier ones.
///
/// Ticket sampling and acting-user resampling draw from `config.seed` unless a
/// source is supplied with [`BookingEngine::with_random_source`].
pub struct BookingEngine {
    config: EngineConfig,
    coordinator: Arc<BookingCoordinator>,
    metrics: Arc<BookingMetrics>,
    sink: Arc<dyn OutcomeSink>,
    random: RandomSourceFactory,
    runtime: ProducerRuntime,
}

impl BookingEngine {
    /// Build an engine that logs each attempt through `tracing`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConfig`] if the configuration is invalid
    /// - [`EngineError::Runtime`] if the producer runtime cannot be built
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_sink(config, Arc::new(TracingOutcomeSink))
    }

    /// Build an engine that reports each attempt to `sink`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConfig`] if the configuration is invalid
    /// - [`EngineError::Runtime`] if the producer runtime cannot be built
    pub fn with_sink(config: EngineConfig, sink: Arc<dyn OutcomeSink>) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let inventory = Inventory::with_counts(config.ticket_count, config.user_count);
        let runtime = ProducerRuntime::with_worker_threads(config.producer_threads)?;

        info!(
            tickets = config.ticket_count,
            users = config.user_count,
            "Inventory created"
        );

        Ok(Self {
            coordinator: Arc::new(BookingCoordinator::new(inventory)),
            metrics: Arc::new(BookingMetrics::new()),
            sink,
            random: seeded_factory(config.seed),
            runtime,
            config,
        })
    }

    /// Replace the random source used by later runs.
    ///
    /// `random(user_id)` feeds that user's producer in [`BookingEngine::simulate`];
    /// workers resampling the acting user get streams from `WORKER_STREAM_BASE`.
    #[must_use]
    pub fn with_random_source(mut self, random: RandomSourceFactory) -> Self {
        self.random = random;
        self
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared coordinator, for inspecting inventory state.
    #[must_use]
    pub const fn coordinator(&self) -> &Arc<BookingCoordinator> {
        &self.coordinator
    }

    /// Cumulative metrics across all runs of this engine.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run the simulation: one producer per user, each sampling
    /// `attempts_per_user` ticket ids and submitting them in batches of
    /// `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the pool cannot start, a producer fails, or
    /// a worker panics.
    pub fn simulate(&self) -> Result<RunReport, EngineError> {
        let ticket_count = self.config.ticket_count;
        let attempts = self.config.attempts_per_user;
        let batch_size = self.config.batch_size;
        let random = Arc::clone(&self.random);
        let users = 1..=self.config.user_count;

        self.dispatch(move |submitter| {
            users
                .map(|user_id| {
                    produce_for_user(
                        user_id,
                        ticket_count,
                        attempts,
                        batch_size,
                        random(u64::from(user_id)),
                        submitter.clone(),
                    )
                })
                .collect::<Vec<_>>()
        })
    }

    /// Dispatch a fixed set of batches through the pool, one producer per batch.
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] if the pool cannot start, a producer fails, or
    /// a worker panics.
    pub fn run_batches(&self, batches: Vec<Batch>) -> Result<RunReport, EngineError> {
        self.dispatch(move |submitter| {
            batches
                .into_iter()
                .map(|batch| {
                    let submitter = submitter.clone();
                    async move {
                        let attempts = batch.len() as u64;
                        submitter.submit_async(batch).await?;
                        Ok(attempts)
                    }
                })
                .collect::<Vec<_>>()
        })
    }

    /// Process batches on the calling thread in order, each booked by its owner.
    ///
    /// Reference path for comparing against pooled runs.
    pub fn process_sequential(&self, batches: &[Batch]) -> RunReport {
        let started = Instant::now();
        let before = self.metrics.snapshot();
        let processor = self.processor();

        let mut attempts = 0_u64;
        for batch in batches {
            processor.process_batch(batch.owner, &batch.ticket_ids);
            attempts += batch.len() as u64;
        }

        self.report(before, batches.len() as u64, attempts, started)
    }

    fn processor(&self) -> BatchProcessor {
        BatchProcessor::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.metrics),
            Arc::clone(&self.sink),
        )
    }

    fn dispatch<M, I, F>(&self, make_producers: M) -> Result<RunReport, EngineError>
    where
        M: FnOnce(BatchSubmitter) -> I,
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<u64, EngineError>> + Send + 'static,
    {
        let started = Instant::now();
        let before = self.metrics.snapshot();

        let pool = WorkerPool::with_random_source(&self.config, self.processor(), &self.random)?;
        let produced = self.runtime.run_producers(make_producers(pool.submitter()));
        // Drain whatever was enqueued even if a producer failed.
        let stats = pool.finish()?;
        let attempts = produced?;

        Ok(self.report(before, stats.processed_batches, attempts, started))
    }

    fn report(
        &self,
        before: MetricsSnapshot,
        batches: u64,
        attempts: u64,
        started: Instant,
    ) -> RunReport {
        let after = self.metrics.snapshot();
        let report = RunReport {
            run_id: Uuid::new_v4(),
            metrics: MetricsSnapshot {
                successful: after.successful - before.successful,
                failed: after.failed - before.failed,
            },
            batches,
            attempts,
            booked_tickets: self.coordinator.booked_count(),
            elapsed: started.elapsed(),
        };

        info!(
            run_id = %report.run_id,
            successful = report.metrics.successful,
            failed = report.metrics.failed,
            batches = report.batches,
            elapsed_ms = report.elapsed.as_millis(),
            "Booking run complete"
        );
        report
    }
}

impl std::fmt::Debug for BookingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEngine")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

/// One simulated user: sample ticket ids and submit them batch by batch.
async fn produce_for_user(
    user_id: UserId,
    ticket_count: u32,
    attempts: usize,
    batch_size: usize,
    mut rng: Box<dyn RandomSource>,
    submitter: BatchSubmitter,
) -> Result<u64, EngineError> {
    let mut ticket_ids: Vec<TicketId> = Vec::with_capacity(batch_size);

    for _ in 0..attempts {
        ticket_ids.push(rng.pick(ticket_count));
        if ticket_ids.len() == batch_size {
            let full = std::mem::replace(&mut ticket_ids, Vec::with_capacity(batch_size));
            submitter.submit_async(Batch::new(user_id, full)).await?;
        }
    }
    if !ticket_ids.is_empty() {
        submitter.submit_async(Batch::new(user_id, ticket_ids)).await?;
    }

    Ok(attempts as u64)
}

/// Load configuration from the environment, initialize tracing and run one simulation.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the run fails.
pub fn run_from_env() -> AppResult<RunReport> {
    init_tracing();
    let config = EngineConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading booking configuration")?;
    let engine = BookingEngine::new(config).context("building booking engine")?;
    engine.simulate().context("running booking simulation")
}
