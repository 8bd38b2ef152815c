/// HTTP client layer
///
/// `AuthenticatedClient` is the shared request façade; `ApiClient` is the
/// per-consumer handle business modules hold, with its own `loading` and
/// `error` state.

mod api;
mod authenticated;
mod notify;
mod options;

use std::sync::atomic::{AtomicUsize, Ordering};

pub use api::ApiClient;
pub use authenticated::{is_unauthenticated_path, AuthenticatedClient, UNAUTHENTICATED_ENDPOINTS};
pub use notify::{LogNotifier, Notifier, Severity, Toast};
pub use options::{ErrorHandler, RequestOptions};

/// Join a base URL and a relative API path with exactly one slash
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Counts a call as in progress until dropped
pub(crate) struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    pub(crate) fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
