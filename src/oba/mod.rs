//! OneBusAway `schedule-for-stop` HTTP client.
//!
//! The Puget Sound OneBusAway deployment serves a per-stop schedule as XML,
//! authenticated by an API key query parameter. The core only needs the raw
//! response bytes; decoding happens downstream, so the fetch boundary is
//! bytes-in, bytes-out.

mod client;
mod error;
mod mock;

pub use client::{ObaClient, ObaConfig};
pub use error::FetchError;
pub use mock::MockFetcher;

/// The remote fetch operation: raw schedule bytes for one stop.
///
/// Implemented by [`ObaClient`] for the live API and [`MockFetcher`] for
/// tests and offline development.
pub trait Fetch {
    fn fetch(
        &self,
        agency_id: i64,
        stop_id: i64,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

impl<F: Fetch> Fetch for &F {
    async fn fetch(&self, agency_id: i64, stop_id: i64) -> Result<Vec<u8>, FetchError> {
        (*self).fetch(agency_id, stop_id).await
    }
}
