//! Configuration models for the booking engine.

pub mod engine;

pub use engine::{ActingUserPolicy, EngineConfig};
