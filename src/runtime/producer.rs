//! Tokio runtime that multiplexes producer tasks onto a fixed set of threads.

use std::future::Future;

use tokio::task::JoinSet;

use crate::core::EngineError;

/// Multi-threaded tokio runtime dedicated to batch producers.
///
/// Producers are lightweight tasks; many of them share `worker_threads`
/// threads and suspend while the batch queue is full.
#[derive(Debug)]
pub struct ProducerRuntime {
    runtime: tokio::runtime::Runtime,
}

impl ProducerRuntime {
    /// Create a runtime with the given number of worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Runtime`] if the runtime cannot be built.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("booking-producer")
            .enable_all()
            .build()
            .map_err(|e| EngineError::Runtime(e.to_string()))?;
        Ok(Self { runtime })
    }

    /// Run every producer to completion and sum what they report.
    ///
    /// All producers are awaited even if some fail; the first failure is returned.
    /// Must not be called from inside another tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the first producer error, or [`EngineError::ProducerFailed`] if a
    /// producer task panicked.
    pub fn run_producers<I, F>(&self, producers: I) -> Result<u64, EngineError>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<u64, EngineError>> + Send + 'static,
    {
        self.runtime.block_on(async move {
            let mut set = JoinSet::new();
            for producer in producers {
                set.spawn(producer);
            }

            let mut total = 0_u64;
            let mut first_error = None;
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Ok(produced)) => total += produced,
                    Ok(Err(e)) => {
                        first_error.get_or_insert(e);
                    }
                    Err(e) => {
                        first_error.get_or_insert(EngineError::ProducerFailed(e.to_string()));
                    }
                }
            }

            first_error.map_or(Ok(total), Err)
        })
    }
}
