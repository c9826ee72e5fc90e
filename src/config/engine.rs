//! Booking engine configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default worker thread stack size (2 MiB).
pub const DEFAULT_WORKER_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Default number of ticket attempts each simulated user produces.
pub const DEFAULT_ATTEMPTS_PER_USER: usize = 3;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "BOOKING_";

/// Which user books the tickets of a dequeued batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActingUserPolicy {
    /// The user that produced the batch books it.
    #[default]
    Owner,
    /// The worker draws a uniformly random user per batch at dequeue time.
    Resample,
}

impl FromStr for ActingUserPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "resample" => Ok(Self::Resample),
            other => Err(format!("unknown acting user policy `{other}`")),
        }
    }
}

/// Engine configuration. Every count must be greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of tickets to create.
    pub ticket_count: u32,
    /// Number of users to create; one producer per user when simulating.
    pub user_count: u32,
    /// Maximum ticket ids per batch.
    pub batch_size: usize,
    /// Ticket attempts produced by each simulated user.
    pub attempts_per_user: usize,
    /// Number of dedicated worker threads.
    pub worker_count: usize,
    /// Maximum pending batches in the queue.
    pub queue_capacity: usize,
    /// Threads of the runtime that multiplexes producer tasks.
    pub producer_threads: usize,
    /// Acting user policy, fixed for the lifetime of a pool.
    pub acting_user: ActingUserPolicy,
    /// Base seed for reproducible sampling; OS entropy when absent.
    pub seed: Option<u64>,
    /// Stack size for each worker thread, in bytes.
    pub worker_stack_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = num_cpus::get().max(1);
        Self {
            ticket_count: 1_000,
            user_count: 50,
            batch_size: 5,
            attempts_per_user: DEFAULT_ATTEMPTS_PER_USER,
            worker_count: cpus * 2,
            queue_capacity: cpus * 2,
            producer_threads: cpus,
            acting_user: ActingUserPolicy::Owner,
            seed: None,
            worker_stack_size: DEFAULT_WORKER_STACK_SIZE,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of tickets.
    #[must_use]
    pub const fn with_ticket_count(mut self, count: u32) -> Self {
        self.ticket_count = count;
        self
    }

    /// Set the number of users.
    #[must_use]
    pub const fn with_user_count(mut self, count: u32) -> Self {
        self.user_count = count;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the attempts each simulated user produces.
    #[must_use]
    pub const fn with_attempts_per_user(mut self, attempts: usize) -> Self {
        self.attempts_per_user = attempts;
        self
    }

    /// Set the worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the producer runtime thread count.
    #[must_use]
    pub const fn with_producer_threads(mut self, threads: usize) -> Self {
        self.producer_threads = threads;
        self
    }

    /// Set the acting user policy.
    #[must_use]
    pub const fn with_acting_user(mut self, policy: ActingUserPolicy) -> Self {
        self.acting_user = policy;
        self
    }

    /// Set a base seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the worker stack size.
    #[must_use]
    pub const fn with_worker_stack_size(mut self, size: usize) -> Self {
        self.worker_stack_size = size;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.ticket_count == 0 {
            return Err("ticket_count must be greater than 0".into());
        }
        if self.user_count == 0 {
            return Err("user_count must be greater than 0".into());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".into());
        }
        if self.attempts_per_user == 0 {
            return Err("attempts_per_user must be greater than 0".into());
        }
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".into());
        }
        if self.producer_threads == 0 {
            return Err("producer_threads must be greater than 0".into());
        }
        if self.worker_stack_size == 0 {
            return Err("worker_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading `.env` first if present.
    ///
    /// Recognized variables: `BOOKING_TICKET_COUNT`, `BOOKING_USER_COUNT`,
    /// `BOOKING_BATCH_SIZE`, `BOOKING_ATTEMPTS_PER_USER`, `BOOKING_WORKER_COUNT`,
    /// `BOOKING_QUEUE_CAPACITY`, `BOOKING_PRODUCER_THREADS`, `BOOKING_ACTING_USER`,
    /// `BOOKING_SEED`, `BOOKING_WORKER_STACK_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable variable or validation failure.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from defaults overridden by `lookup(name)` values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable value or validation failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        override_from(&lookup, "TICKET_COUNT", &mut cfg.ticket_count)?;
        override_from(&lookup, "USER_COUNT", &mut cfg.user_count)?;
        override_from(&lookup, "BATCH_SIZE", &mut cfg.batch_size)?;
        override_from(&lookup, "ATTEMPTS_PER_USER", &mut cfg.attempts_per_user)?;
        override_from(&lookup, "WORKER_COUNT", &mut cfg.worker_count)?;
        override_from(&lookup, "QUEUE_CAPACITY", &mut cfg.queue_capacity)?;
        override_from(&lookup, "PRODUCER_THREADS", &mut cfg.producer_threads)?;
        override_from(&lookup, "ACTING_USER", &mut cfg.acting_user)?;
        override_from(&lookup, "WORKER_STACK_SIZE", &mut cfg.worker_stack_size)?;
        if let Some(seed) = parse_var(&lookup, "SEED")? {
            cfg.seed = Some(seed);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Total attempts a simulation with this configuration issues.
    #[must_use]
    pub fn total_attempts(&self) -> u64 {
        u64::from(self.user_count) * self.attempts_per_user as u64
    }
}

fn parse_var<F, T>(lookup: &F, suffix: &str) -> Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{ENV_PREFIX}{suffix}");
    lookup(&key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| format!("{key}: invalid value `{raw}`: {e}"))
        })
        .transpose()
}

fn override_from<F, T>(lookup: &F, suffix: &str, target: &mut T) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = parse_var(lookup, suffix)? {
        *target = value;
    }
    Ok(())
}
