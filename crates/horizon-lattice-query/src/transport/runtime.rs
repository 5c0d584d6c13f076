//! Shared tokio runtime driving the blocking transport.
//!
//! The public API of this crate is synchronous. HTTP requests are async
//! underneath and run to completion on this runtime.

use std::sync::OnceLock;

use tokio::runtime::Runtime;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get the runtime, initializing it on first use.
///
/// Called lazily on the first request; call it early to pay the start-up
/// cost up front.
pub fn init() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("lattice-query-io")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Block the current thread on a future.
///
/// # Warning
///
/// Do not call this from within an async context; tokio panics when a
/// runtime is blocked on from one of its own tasks.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    init().block_on(future)
}
