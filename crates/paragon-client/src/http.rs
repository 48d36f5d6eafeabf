//! Shared HTTP plumbing
//!
//! Uses async reqwest internally but presents a sync interface, since the
//! engine drives its lookups from ordinary (possibly rayon) threads. One
//! pooled client and one small runtime serve the whole process.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Upper bound on one complete request-response cycle.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(60);

static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(8)
        .build()
        .expect("failed to build HTTP client")
});

pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Run a future to completion on the shared runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    SHARED_RUNTIME.handle().block_on(future)
}
