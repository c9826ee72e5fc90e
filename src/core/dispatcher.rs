//! Work dispatcher: a fixed pool of worker threads draining a bounded batch queue.
//!
//! Producers hand batches to a [`BatchSubmitter`]; a full queue blocks
//! ([`BatchSubmitter::submit`]) or suspends ([`BatchSubmitter::submit_async`])
//! the producer until a worker makes room. Each worker thread loops on a
//! blocking `recv` and exits once the queue is closed and empty.
//!
//! # Design
//!
//! - **Backpressure**: the queue holds at most `queue_capacity` batches
//! - **Explicit barrier**: [`PendingWork`] counts submitted-but-unprocessed
//!   batches and the workers still able to drain them
//! - **Clean shutdown**: [`WorkerPool::finish`] waits for the barrier, drops the
//!   sender, then joins every worker

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::config::{ActingUserPolicy, EngineConfig};
use crate::core::{Batch, BatchProcessor, EngineError, UserId};
use crate::util::random::{seeded_factory, RandomSource, RandomSourceFactory};

/// Offset keeping worker RNG streams apart from producer streams.
pub const WORKER_STREAM_BASE: u64 = 1 << 32;

/// Statistics about pool throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Batches accepted into the queue.
    pub submitted_batches: u64,
    /// Batches fully processed by a worker.
    pub processed_batches: u64,
    /// Batches sitting in the queue, not yet taken by a worker.
    ///
    /// Producers still blocked on a full queue are not counted.
    pub queued_batches: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    dequeued: AtomicU64,
    processed: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self, worker_count: usize) -> PoolStats {
        // A worker may dequeue a batch before its producer counts the send.
        let dequeued = self.dequeued.load(Ordering::Acquire);
        let submitted = self.submitted.load(Ordering::Acquire);
        PoolStats {
            worker_count,
            submitted_batches: submitted,
            processed_batches: self.processed.load(Ordering::Acquire),
            queued_batches: submitted.saturating_sub(dequeued),
        }
    }
}

#[derive(Debug, Default)]
struct PendingState {
    outstanding: usize,
    live_workers: usize,
}

/// Count of outstanding batches plus a completion signal.
///
/// Also tracks how many workers are alive: once none are left nothing can
/// drain the queue, so waiters are released with work still outstanding.
#[derive(Debug, Default)]
pub struct PendingWork {
    state: Mutex<PendingState>,
    idle: Condvar,
}

impl PendingWork {
    /// Create an idle barrier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of outstanding work.
    pub fn add(&self) {
        self.state.lock().outstanding += 1;
    }

    /// Mark one unit done, waking waiters when none remain.
    pub fn done(&self) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding == 0 {
            self.idle.notify_all();
        }
    }

    /// Register a worker that will drain outstanding work.
    pub fn worker_started(&self) {
        self.state.lock().live_workers += 1;
    }

    /// Deregister a worker, waking waiters when it was the last one.
    pub fn worker_exited(&self) {
        let mut state = self.state.lock();
        state.live_workers = state.live_workers.saturating_sub(1);
        if state.live_workers == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until no work is outstanding or no worker is left to do it.
    ///
    /// Returns the number of units still outstanding, which is non-zero only
    /// when every worker has exited first.
    pub fn wait_idle(&self) -> usize {
        let mut state = self.state.lock();
        while state.outstanding > 0 && state.live_workers > 0 {
            self.idle.wait(&mut state);
        }
        state.outstanding
    }

    /// Current outstanding count.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }
}

/// Marks a batch done on drop, including while a panic unwinds the worker.
struct DoneGuard<'a>(&'a PendingWork);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Deregisters a worker when its thread ends, normally or by panic.
struct LiveGuard(Arc<Shared>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.pending.worker_exited();
    }
}

/// State shared between the pool, its submitters and its workers.
#[derive(Debug)]
struct Shared {
    /// Batch sender. `None` once the queue is closed.
    tx: Mutex<Option<Sender<Batch>>>,
    pending: PendingWork,
    counters: PoolCounters,
}

impl Shared {
    fn sender(&self) -> Result<Sender<Batch>, EngineError> {
        self.tx.lock().clone().ok_or(EngineError::QueueClosed)
    }

    fn admit(&self) -> Admission<'_> {
        self.pending.add();
        Admission {
            shared: self,
            sent: false,
        }
    }
}

/// A batch registered with the barrier ahead of its send.
///
/// Dropped without [`Admission::sent`] (send failed, or an async send was
/// cancelled) it releases the barrier again.
struct Admission<'a> {
    shared: &'a Shared,
    sent: bool,
}

impl Admission<'_> {
    fn sent(mut self) {
        self.sent = true;
        self.shared.counters.submitted.fetch_add(1, Ordering::AcqRel);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.sent {
            self.shared.pending.done();
        }
    }
}

/// Cloneable handle producers use to enqueue batches.
#[derive(Debug, Clone)]
pub struct BatchSubmitter {
    shared: Arc<Shared>,
}

impl BatchSubmitter {
    /// Enqueue a batch, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::QueueClosed`] if the pool has been finished or
    /// every worker has exited.
    pub fn submit(&self, batch: Batch) -> Result<(), EngineError> {
        let tx = self.shared.sender()?;
        let admission = self.shared.admit();
        tx.send(batch).map_err(|_| EngineError::QueueClosed)?;
        admission.sent();
        Ok(())
    }

    /// Enqueue a batch, suspending while the queue is full.
    ///
    /// Dropping the returned future before it completes leaves the batch unsent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::QueueClosed`] if the pool has been finished or
    /// every worker has exited.
    pub async fn submit_async(&self, batch: Batch) -> Result<(), EngineError> {
        let tx = self.shared.sender()?;
        let admission = self.shared.admit();
        tx.send_async(batch)
            .await
            .map_err(|_| EngineError::QueueClosed)?;
        admission.sent();
        Ok(())
    }
}

/// Fixed pool of dedicated worker threads consuming one bounded batch queue.
#[derive(Debug)]
pub struct WorkerPool {
    worker_count: usize,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `config.worker_count` workers behind a queue of `config.queue_capacity`.
    ///
    /// Workers resampling the acting user draw from `config.seed`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConfig`] if the configuration is invalid
    /// - [`EngineError::WorkerSpawn`] if a worker thread cannot be started
    pub fn new(config: &EngineConfig, processor: BatchProcessor) -> Result<Self, EngineError> {
        Self::with_random_source(config, processor, &seeded_factory(config.seed))
    }

    /// Like [`WorkerPool::new`], drawing resampled acting users from `random`.
    ///
    /// Worker `n` receives stream `WORKER_STREAM_BASE + n`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidConfig`] if the configuration is invalid
    /// - [`EngineError::WorkerSpawn`] if a worker thread cannot be started
    pub fn with_random_source(
        config: &EngineConfig,
        processor: BatchProcessor,
        random: &RandomSourceFactory,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let (tx, rx) = flume::bounded::<Batch>(config.queue_capacity);
        let shared = Arc::new(Shared {
            tx: Mutex::new(Some(tx)),
            pending: PendingWork::new(),
            counters: PoolCounters::default(),
        });

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let picker = UserPicker {
                policy: config.acting_user,
                user_count: config.user_count,
                rng: random(WORKER_STREAM_BASE + worker_id as u64),
            };
            let worker = spawn_worker(
                worker_id,
                rx.clone(),
                processor.clone(),
                Arc::clone(&shared),
                picker,
                config.worker_stack_size,
            );
            match worker {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Closing the queue lets the already-started workers exit.
                    shared.tx.lock().take();
                    return Err(e);
                }
            }
        }

        info!(
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            acting_user = ?config.acting_user,
            "WorkerPool started"
        );

        Ok(Self {
            worker_count: config.worker_count,
            shared,
            workers,
        })
    }

    /// Handle for enqueuing batches.
    #[must_use]
    pub fn submitter(&self) -> BatchSubmitter {
        BatchSubmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared.counters.snapshot(self.worker_count)
    }

    /// Batches submitted but not yet fully processed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.shared.pending.outstanding()
    }

    /// Wait for every submitted batch, close the queue and join all workers.
    ///
    /// Call this once producers are done. When it returns, every mutation made
    /// by the workers is visible to the caller. If every worker dies first the
    /// wait ends early and the batches left behind are reported, not awaited.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkerPanicked`] naming the first worker that
    /// panicked and how many accepted batches were never processed.
    pub fn finish(mut self) -> Result<PoolStats, EngineError> {
        self.shared.pending.wait_idle();
        self.close();

        let mut panicked = None;
        for (worker_id, worker) in std::mem::take(&mut self.workers).into_iter().enumerate() {
            if worker.join().is_err() {
                warn!(worker_id = worker_id, "Worker panicked");
                panicked.get_or_insert(worker_id);
            } else {
                debug!(worker_id = worker_id, "Worker joined");
            }
        }

        // Read after the join: every receiver is gone, so nothing is in flight.
        let unprocessed = self.shared.pending.outstanding();
        let stats = self.stats();
        info!(
            worker_count = self.worker_count,
            processed_batches = stats.processed_batches,
            unprocessed = unprocessed,
            "WorkerPool finished"
        );

        match panicked {
            Some(worker_id) => Err(EngineError::WorkerPanicked {
                worker_id,
                unprocessed,
            }),
            None => Ok(stats),
        }
    }

    fn close(&self) {
        self.shared.tx.lock().take();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Close the queue but don't join; workers drain and exit on their own.
        if !self.workers.is_empty() {
            self.close();
            debug!("WorkerPool dropped without finish - workers will be detached");
        }
    }
}

/// Resolves the acting user for each dequeued batch.
struct UserPicker {
    policy: ActingUserPolicy,
    user_count: u32,
    rng: Box<dyn RandomSource>,
}

impl UserPicker {
    fn acting_user(&mut self, batch: &Batch) -> UserId {
        match self.policy {
            ActingUserPolicy::Owner => batch.owner,
            ActingUserPolicy::Resample => self.rng.pick(self.user_count),
        }
    }
}

fn spawn_worker(
    worker_id: usize,
    rx: Receiver<Batch>,
    processor: BatchProcessor,
    shared: Arc<Shared>,
    mut picker: UserPicker,
    stack_size: usize,
) -> Result<JoinHandle<()>, EngineError> {
    // Registered before the spawn; a failed spawn drops the guard unused.
    shared.pending.worker_started();
    let live = LiveGuard(Arc::clone(&shared));

    thread::Builder::new()
        .name(format!("booking-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            let _live = live;
            debug!(worker_id = worker_id, "Worker thread started");

            // recv() fails only once every sender is gone and the queue is empty.
            while let Ok(batch) = rx.recv() {
                let _done = DoneGuard(&shared.pending);
                shared.counters.dequeued.fetch_add(1, Ordering::AcqRel);

                let user_id = picker.acting_user(&batch);
                debug!(
                    worker_id = worker_id,
                    owner = batch.owner,
                    user_id = user_id,
                    attempts = batch.len(),
                    "Worker processing batch"
                );
                processor.process_batch(user_id, &batch.ticket_ids);
                shared.counters.processed.fetch_add(1, Ordering::AcqRel);
            }

            debug!(worker_id = worker_id, "Worker channel closed, exiting");
        })
        .map_err(|e| EngineError::WorkerSpawn(e.to_string()))
}
