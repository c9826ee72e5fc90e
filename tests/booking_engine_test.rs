//! Integration tests for the booking engine.
//!
//! These tests validate:
//! - No ticket is booked twice under contention
//! - Success + failure counts equal attempts for any pool shape
//! - Sequential and pooled runs of a fixed sequence book the same tickets
//! - Booked tickets reject every later attempt without mutation
//! - A single worker behind a capacity-1 queue never deadlocks
//! - A panicking worker surfaces as an error instead of stalling the run

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use prometheus_booking::config::{ActingUserPolicy, EngineConfig};
use prometheus_booking::core::{
    chunk_batches, Batch, BatchProcessor, BookingCoordinator, BookingError, BookingMetrics,
    BookingEvent, BookingOutcome, ChannelOutcomeSink, EngineError, InMemoryOutcomeSink, Inventory,
    NoopOutcomeSink, OutcomeSink, TicketStatus, WorkerPool,
};
use prometheus_booking::engine::BookingEngine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn small_config(tickets: u32, users: u32) -> EngineConfig {
    EngineConfig::new()
        .with_ticket_count(tickets)
        .with_user_count(users)
        .with_producer_threads(2)
        .with_seed(2024)
}

fn random_batches(seed: u64, users: u32, tickets: u32, per_user: usize, batch_size: usize) -> Vec<Batch> {
    let mut rng = StdRng::seed_from_u64(seed);
    (1..=users)
        .flat_map(|user| {
            let ids: Vec<u32> = (0..per_user).map(|_| rng.random_range(1..=tickets)).collect();
            chunk_batches(user, &ids, batch_size)
        })
        .collect()
}

fn assert_inventory_consistent(coordinator: &BookingCoordinator, expected_successes: u64) {
    let inventory = coordinator.inventory_snapshot();

    let mut owners: HashMap<u32, u32> = HashMap::new();
    for user in inventory.users() {
        for ticket in &user.booked_tickets {
            assert_eq!(ticket.status, TicketStatus::Booked);
            let previous = owners.insert(ticket.id, user.id);
            assert!(previous.is_none(), "ticket {} sold twice", ticket.id);
        }
    }

    let booked: BTreeSet<u32> = inventory
        .tickets()
        .filter(|t| t.status == TicketStatus::Booked)
        .map(|t| t.id)
        .collect();
    let held: BTreeSet<u32> = owners.keys().copied().collect();

    assert_eq!(booked, held);
    assert_eq!(booked.len() as u64, expected_successes);
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_duplicate_ids_single_user() {
    let engine = BookingEngine::with_sink(small_config(10, 1), Arc::new(NoopOutcomeSink)).unwrap();

    let report = engine.process_sequential(&[Batch::new(1, vec![3, 3, 3, 3])]);

    assert_eq!(report.metrics.successful, 1);
    assert_eq!(report.metrics.failed, 3);
    assert_eq!(engine.coordinator().user_history(1).unwrap().len(), 1);
    assert_eq!(engine.coordinator().booked_ticket_ids(), BTreeSet::from([3]));
}

#[test]
fn test_thousand_tickets_fifty_users() {
    let config = small_config(1_000, 50)
        .with_batch_size(5)
        .with_worker_count(4)
        .with_attempts_per_user(20);
    let engine = BookingEngine::with_sink(config, Arc::new(NoopOutcomeSink)).unwrap();

    let report = engine.simulate().unwrap();

    assert_eq!(report.attempts, 50 * 20);
    assert_eq!(report.metrics.total(), 50 * 20);
    assert!(report.metrics.successful <= 1_000);
    assert_eq!(report.metrics.successful as usize, report.booked_tickets);
    assert_eq!(report.batches, 50 * 4);
    assert_inventory_consistent(engine.coordinator(), report.metrics.successful);
}

#[test]
fn test_single_worker_capacity_one_two_producers() {
    let config = small_config(10, 2).with_worker_count(1).with_queue_capacity(1);
    let engine = BookingEngine::with_sink(config, Arc::new(NoopOutcomeSink)).unwrap();

    let report = engine
        .run_batches(vec![Batch::new(1, vec![1, 2, 3]), Batch::new(2, vec![4, 5, 6])])
        .unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.metrics.successful, 6);
    assert_eq!(engine.coordinator().user_history(1).unwrap().len(), 3);
    assert_eq!(engine.coordinator().user_history(2).unwrap().len(), 3);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_counts_match_attempts_for_any_pool_shape() {
    for (batch_size, workers, capacity) in [(1, 1, 1), (3, 2, 1), (7, 8, 2), (50, 3, 16)] {
        let config = small_config(200, 20)
            .with_batch_size(batch_size)
            .with_worker_count(workers)
            .with_queue_capacity(capacity)
            .with_attempts_per_user(25);
        let engine = BookingEngine::with_sink(config, Arc::new(NoopOutcomeSink)).unwrap();

        let report = engine.simulate().unwrap();

        assert_eq!(report.metrics.total(), 20 * 25, "batch_size={batch_size} workers={workers}");
        assert_inventory_consistent(engine.coordinator(), report.metrics.successful);
    }
}

#[test]
fn test_sequential_and_pooled_book_same_set() {
    let batches = random_batches(11, 30, 150, 12, 4);

    let sequential = BookingEngine::with_sink(small_config(150, 30), Arc::new(NoopOutcomeSink)).unwrap();
    let seq_report = sequential.process_sequential(&batches);

    let pooled_config = small_config(150, 30).with_worker_count(6).with_queue_capacity(3);
    let pooled = BookingEngine::with_sink(pooled_config, Arc::new(NoopOutcomeSink)).unwrap();
    let pool_report = pooled.run_batches(batches).unwrap();

    assert_eq!(
        sequential.coordinator().booked_ticket_ids(),
        pooled.coordinator().booked_ticket_ids()
    );
    assert_eq!(seq_report.metrics, pool_report.metrics);
}

#[test]
fn test_booked_ticket_rejects_every_later_attempt() {
    let coordinator = Arc::new(BookingCoordinator::new(Inventory::with_counts(1, 8)));
    coordinator.book_ticket(1, 1).unwrap();

    let handles: Vec<_> = (1..=8)
        .map(|user| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(
                        coordinator.book_ticket(user, 1),
                        Err(BookingError::AlreadyBooked(1))
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(coordinator.user_history(1).unwrap().len(), 1);
    assert_eq!(coordinator.history_total(), 1);
}

#[test]
fn test_full_contention_every_ticket_once() {
    // Every user tries every ticket; each ticket must be won exactly once.
    let tickets = 64;
    let users = 16;
    let batches: Vec<Batch> = (1..=users)
        .map(|user| Batch::new(user, (1..=tickets).collect()))
        .collect();

    let config = small_config(tickets, users).with_worker_count(8).with_queue_capacity(2);
    let engine = BookingEngine::with_sink(config, Arc::new(NoopOutcomeSink)).unwrap();
    let report = engine.run_batches(batches).unwrap();

    assert_eq!(report.metrics.successful, u64::from(tickets));
    assert_eq!(report.metrics.failed, u64::from(tickets * (users - 1)));
    assert_inventory_consistent(engine.coordinator(), u64::from(tickets));
}

#[test]
fn test_resample_policy_preserves_ticket_guarantees() {
    let config = small_config(300, 10)
        .with_acting_user(ActingUserPolicy::Resample)
        .with_attempts_per_user(40)
        .with_batch_size(8)
        .with_worker_count(4);
    let engine = BookingEngine::with_sink(config, Arc::new(NoopOutcomeSink)).unwrap();

    let report = engine.simulate().unwrap();

    assert_eq!(report.metrics.total(), 400);
    assert_eq!(
        engine.coordinator().history_total() as u64,
        report.metrics.successful
    );
    assert_inventory_consistent(engine.coordinator(), report.metrics.successful);
}

#[test]
fn test_events_match_metrics() {
    let (sink, rx) = ChannelOutcomeSink::unbounded();
    let config = small_config(50, 5).with_attempts_per_user(10).with_batch_size(4);
    let engine = BookingEngine::with_sink(config, Arc::new(sink)).unwrap();

    let report = engine.simulate().unwrap();
    let events: Vec<_> = rx.try_iter().collect();

    assert_eq!(events.len() as u64, report.metrics.total());
    let booked = events.iter().filter(|e| e.outcome == BookingOutcome::Booked).count();
    assert_eq!(booked as u64, report.metrics.successful);
}

#[test]
fn test_out_of_range_ids_are_failures_not_fatal() {
    let sink = Arc::new(InMemoryOutcomeSink::new(16));
    let engine = BookingEngine::with_sink(small_config(5, 2), sink.clone()).unwrap();

    let report = engine
        .run_batches(vec![Batch::new(1, vec![0, 1, 6]), Batch::new(3, vec![2])])
        .unwrap();

    assert_eq!(report.metrics.successful, 1);
    assert_eq!(report.metrics.failed, 3);
    let mut outcomes: Vec<_> = sink.events().iter().map(|e| e.outcome).collect();
    outcomes.sort_by_key(|o| format!("{o:?}"));
    assert_eq!(
        outcomes,
        vec![
            BookingOutcome::Booked,
            BookingOutcome::TicketNotFound,
            BookingOutcome::TicketNotFound,
            BookingOutcome::UserNotFound,
        ]
    );
}

#[test]
fn test_pool_driven_from_plain_threads() {
    let coordinator = Arc::new(BookingCoordinator::new(Inventory::with_counts(500, 10)));
    let metrics = Arc::new(BookingMetrics::new());
    let processor = BatchProcessor::new(
        Arc::clone(&coordinator),
        Arc::clone(&metrics),
        Arc::new(NoopOutcomeSink),
    );
    let pool = WorkerPool::new(&small_config(500, 10).with_worker_count(3).with_queue_capacity(1), processor)
        .unwrap();

    let producers: Vec<_> = (1..=10_u32)
        .map(|user| {
            let submitter = pool.submitter();
            thread::spawn(move || {
                let ids: Vec<u32> = ((user - 1) * 50 + 1..=user * 50).collect();
                for batch in chunk_batches(user, &ids, 7) {
                    submitter.submit(batch).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let stats = pool.finish().unwrap();

    assert_eq!(stats.submitted_batches, stats.processed_batches);
    assert_eq!(metrics.snapshot().successful, 500);
    assert_eq!(coordinator.booked_count(), 500);
    for user in 1..=10 {
        assert_eq!(coordinator.user_history(user).unwrap().len(), 50);
    }
}

// ============================================================================
// FAILURE HANDLING
// ============================================================================

struct PanicOnBooked;

impl OutcomeSink for PanicOnBooked {
    fn record(&self, event: BookingEvent) {
        assert_ne!(event.outcome, BookingOutcome::Booked, "sink refused a booking");
    }
}

#[test]
fn test_worker_panic_ends_run_with_error() {
    let config = small_config(100, 8)
        .with_worker_count(2)
        .with_queue_capacity(1)
        .with_attempts_per_user(12)
        .with_batch_size(2);
    let engine = BookingEngine::with_sink(config, Arc::new(PanicOnBooked)).unwrap();

    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let _ = tx.send(engine.simulate());
    });

    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("run stalled after its workers panicked");
    assert!(matches!(result, Err(EngineError::WorkerPanicked { .. })));
}
