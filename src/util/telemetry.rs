//! Log output for engine runs.

/// Install a `tracing_subscriber::fmt` subscriber filtered by `RUST_LOG`.
///
/// Lines carry the thread name, so `booking-worker-*` and `booking-producer`
/// output can be told apart. Does nothing when a global subscriber exists.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_names(true)
        .try_init();
}
