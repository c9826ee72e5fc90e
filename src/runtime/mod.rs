//! Runtime adapters for producer tasks.

pub mod producer;

pub use producer::ProducerRuntime;
