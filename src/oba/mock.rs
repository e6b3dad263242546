//! Mock fetcher for testing without API access.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Fetch;
use super::error::FetchError;

/// Fetcher that serves a canned response and counts calls.
///
/// Useful for exercising the cache and service layers without network
/// access: the call counter makes cache hits and refreshes observable.
#[derive(Debug)]
pub struct MockFetcher {
    body: Mutex<Option<Vec<u8>>>,
    calls: AtomicUsize,
}

impl MockFetcher {
    /// Create a mock that returns `body` on every fetch.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Mutex::new(Some(body.into())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock whose every fetch fails with an API error.
    pub fn failing() -> Self {
        Self {
            body: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the canned response body.
    pub fn set_body(&self, body: impl Into<Vec<u8>>) {
        *self.body.lock().unwrap() = Some(body.into());
    }

    /// Number of fetches performed so far.
    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for MockFetcher {
    async fn fetch(&self, _agency_id: i64, _stop_id: i64) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.body.lock().unwrap().clone() {
            Some(body) => Ok(body),
            None => Err(FetchError::Api {
                status: 503,
                message: "mock fetcher configured to fail".to_string(),
            }),
        }
    }
}
