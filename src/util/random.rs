//! Pseudo-random identifier sampling.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniformly distributed 1-based identifiers.
pub trait RandomSource: Send {
    /// Sample uniformly from `1..=upper`.
    ///
    /// # Panics
    ///
    /// Panics if `upper` is zero.
    fn pick(&mut self, upper: u32) -> u32;
}

impl<R: Rng + Send> RandomSource for R {
    fn pick(&mut self, upper: u32) -> u32 {
        self.random_range(1..=upper)
    }
}

/// Builds the random source for one numbered stream.
///
/// Producers use their user id as the stream; workers use
/// `WORKER_STREAM_BASE + worker_id`.
pub type RandomSourceFactory = Arc<dyn Fn(u64) -> Box<dyn RandomSource> + Send + Sync>;

/// Build an RNG for one independent stream (a producer or a worker).
///
/// With a base seed the stream is reproducible; without one it is seeded from
/// the operating system.
#[must_use]
pub fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_os_rng(),
    }
}

/// Factory handing out [`seeded_rng`] streams.
#[must_use]
pub fn seeded_factory(seed: Option<u64>) -> RandomSourceFactory {
    Arc::new(move |stream: u64| -> Box<dyn RandomSource> {
        Box::new(seeded_rng(seed, stream))
    })
}
