//! Shared utilities: clock, random sources, telemetry.

pub mod clock;
pub mod random;
pub mod telemetry;

pub use clock::now_ms;
pub use random::{seeded_factory, seeded_rng, RandomSource, RandomSourceFactory};
pub use telemetry::init_tracing;
