//! Stop schedule service: the crate's entry points.
//!
//! Ties the pipeline together: ensure the cached response is fresh, decode
//! it into a snapshot of routes and per-route schedules, and answer the
//! next-departures query against that snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{BlobStore, CacheError, CacheKey, ResponseCache};
use crate::decode::DecodeError;
use crate::model::{Route, StopSchedule};
use crate::oba::{Fetch, FetchError};

/// Conventional number of upcoming departures to return.
pub const DEFAULT_NEXT_COUNT: usize = 3;

/// Errors surfaced by [`StopScheduleService`].
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The remote fetch failed
    #[error(transparent)]
    Fetch(FetchError),

    /// The cache blob store failed
    #[error("cache store error: {0}")]
    Store(String),

    /// The response could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// No route with the given short name in the snapshot
    #[error("no route with short name {0:?}")]
    RouteNotFound(String),

    /// A route resolved, but no schedule exists for its route id
    #[error("no schedule for route id {0:?}")]
    ScheduleNotFound(String),
}

impl From<CacheError> for ScheduleError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Fetch(e) => ScheduleError::Fetch(e),
            CacheError::Store { message } => ScheduleError::Store(message),
        }
    }
}

/// One decoded response: everything known about a stop's schedule.
///
/// Replaced wholesale when a fresh response is decoded; nothing in here is
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopSnapshot {
    /// Routes serving the stop, keyed by short name (last write wins when
    /// the feed repeats a short name).
    pub routes_by_short_name: HashMap<String, Route>,

    /// Per-route schedules, keyed by route id.
    pub schedules_by_route_id: HashMap<String, StopSchedule>,
}

/// Decode a raw `schedule-for-stop` response into a snapshot.
///
/// Walks every `<routes>` section for route elements and every
/// `<stopRouteSchedules>` section for per-route schedule elements; any
/// malformed element fails the whole decode.
pub fn decode_snapshot(bytes: &[u8]) -> Result<StopSnapshot, ScheduleError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::Malformed {
        message: format!("response is not UTF-8: {e}"),
    })?;

    let doc = roxmltree::Document::parse(text).map_err(|e| DecodeError::Malformed {
        message: e.to_string(),
    })?;

    let mut routes_by_short_name = HashMap::new();
    for section in elements_named(&doc, "routes") {
        for node in section.children().filter(roxmltree::Node::is_element) {
            let route = Route::from_element(node)?;
            routes_by_short_name.insert(route.short_name.clone(), route);
        }
    }

    let mut schedules_by_route_id = HashMap::new();
    for section in elements_named(&doc, "stopRouteSchedules") {
        for node in section.children().filter(roxmltree::Node::is_element) {
            let schedule = StopSchedule::from_element(node)?;
            schedules_by_route_id.insert(schedule.route_id.clone(), schedule);
        }
    }

    debug!(
        routes = routes_by_short_name.len(),
        schedules = schedules_by_route_id.len(),
        "decoded stop schedule snapshot"
    );

    Ok(StopSnapshot {
        routes_by_short_name,
        schedules_by_route_id,
    })
}

fn elements_named<'a>(
    doc: &'a roxmltree::Document<'a>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    doc.descendants()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Schedule queries for one stop at one agency.
///
/// Owns the cache entry for its `(agency_id, stop_id)` key; entries for
/// other keys are never touched.
pub struct StopScheduleService<F, S> {
    cache: ResponseCache<F, S>,
    key: CacheKey,
}

impl<F: Fetch, S: BlobStore> StopScheduleService<F, S> {
    /// Create a service with the default cache TTL (24 hours).
    pub fn new(fetcher: F, store: S, agency_id: i64, stop_id: i64) -> Self {
        Self {
            cache: ResponseCache::new(fetcher, store),
            key: CacheKey::new(agency_id, stop_id),
        }
    }

    /// Create a service with a custom cache TTL in seconds.
    pub fn with_ttl(fetcher: F, store: S, agency_id: i64, stop_id: i64, ttl_secs: u64) -> Self {
        Self {
            cache: ResponseCache::with_ttl(fetcher, store, ttl_secs),
            key: CacheKey::new(agency_id, stop_id),
        }
    }

    /// The cache key this service owns.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Fetch (if stale) and decode the stop's schedule.
    pub async fn get_stop_schedule(&self) -> Result<StopSnapshot, ScheduleError> {
        let bytes = self.cache.ensure(&self.key).await?;
        decode_snapshot(&bytes)
    }

    /// The next `count` departures for a route at this stop, from now.
    /// [`DEFAULT_NEXT_COUNT`] is the conventional `count`.
    pub async fn get_next_stops(
        &self,
        route_short_name: &str,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        self.get_next_stops_after(route_short_name, count, Utc::now())
            .await
    }

    /// The next `count` departures strictly later than `now`.
    ///
    /// Two-step lookup: the route by short name, then its schedule by
    /// `Route::id`. Departures are sorted chronologically before filtering,
    /// so a feed that emits stop times out of order cannot hide earlier
    /// departures. Returns fewer than `count` entries (possibly none) when
    /// the schedule is exhausted.
    pub async fn get_next_stops_after(
        &self,
        route_short_name: &str,
        count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        let snapshot = self.get_stop_schedule().await?;

        let route = snapshot
            .routes_by_short_name
            .get(route_short_name)
            .ok_or_else(|| ScheduleError::RouteNotFound(route_short_name.to_string()))?;

        let schedule = snapshot
            .schedules_by_route_id
            .get(&route.id)
            .ok_or_else(|| ScheduleError::ScheduleNotFound(route.id.clone()))?;

        let mut departures: Vec<DateTime<Utc>> = schedule
            .stops
            .iter()
            .map(|stop| stop.departure_instant)
            .collect();
        departures.sort_unstable();

        Ok(departures
            .into_iter()
            .filter(|departure| *departure > now)
            .take(count)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBlobStore;
    use crate::oba::MockFetcher;

    const AGENCY: i64 = 1;
    const STOP: i64 = 75403;

    fn route_xml(id: &str, short_name: &str) -> String {
        format!("<route><id>{id}</id><shortName>{short_name}</shortName></route>")
    }

    fn stop_time_xml(trip: &str, departure_secs: i64) -> String {
        let millis = departure_secs * 1000 + 123;
        format!(
            "<scheduleStopTime>\
               <tripId>{trip}</tripId>\
               <arrivalTime>{millis}</arrivalTime>\
               <departureTime>{millis}</departureTime>\
             </scheduleStopTime>"
        )
    }

    fn schedule_xml(route_id: &str, stop_times: &str) -> String {
        format!(
            "<stopRouteSchedule>\
               <routeId>{route_id}</routeId>\
               <stopRouteDirectionSchedules>\
                 <stopRouteDirectionSchedule>\
                   <scheduleStopTimes>{stop_times}</scheduleStopTimes>\
                 </stopRouteDirectionSchedule>\
               </stopRouteDirectionSchedules>\
             </stopRouteSchedule>"
        )
    }

    fn response_xml(routes: &str, schedules: &str) -> String {
        format!(
            "<response><data>\
               <routes>{routes}</routes>\
               <stopRouteSchedules>{schedules}</stopRouteSchedules>\
             </data></response>"
        )
    }

    fn instant(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn decodes_both_mappings() {
        let xml = response_xml(
            &(route_xml("1_100223", "550") + &route_xml("1_100224", "554")),
            &schedule_xml("1_100223", &stop_time_xml("T1", 1_609_459_200)),
        );

        let snapshot = decode_snapshot(xml.as_bytes()).unwrap();

        assert_eq!(snapshot.routes_by_short_name.len(), 2);
        assert_eq!(snapshot.routes_by_short_name["550"].id, "1_100223");
        assert_eq!(snapshot.schedules_by_route_id.len(), 1);
        assert_eq!(snapshot.schedules_by_route_id["1_100223"].stops.len(), 1);
    }

    #[test]
    fn duplicate_short_name_last_write_wins() {
        let xml = response_xml(
            &(route_xml("R_old", "550") + &route_xml("R_new", "550")),
            "",
        );

        let snapshot = decode_snapshot(xml.as_bytes()).unwrap();
        assert_eq!(snapshot.routes_by_short_name.len(), 1);
        assert_eq!(snapshot.routes_by_short_name["550"].id, "R_new");
    }

    #[test]
    fn malformed_xml_fails() {
        let err = decode_snapshot(b"<response><data>").unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Decode(DecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn non_utf8_response_fails() {
        let err = decode_snapshot(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Decode(DecodeError::Malformed { .. })
        ));
    }

    fn service_for(
        fetcher: &MockFetcher,
    ) -> StopScheduleService<&MockFetcher, MemoryBlobStore> {
        StopScheduleService::new(fetcher, MemoryBlobStore::new(), AGENCY, STOP)
    }

    #[tokio::test]
    async fn next_stops_filters_and_limits() {
        let t = 1_609_459_200;
        let stop_times = stop_time_xml("T0", t - 100)
            + &stop_time_xml("T1", t + 50)
            + &stop_time_xml("T2", t + 200)
            + &stop_time_xml("T3", t + 400);
        let xml = response_xml(&route_xml("R1", "550"), &schedule_xml("R1", &stop_times));

        let fetcher = MockFetcher::new(xml);
        let service = service_for(&fetcher);

        let next = service
            .get_next_stops_after("550", 2, instant(t))
            .await
            .unwrap();
        assert_eq!(next, [instant(t + 50), instant(t + 200)]);

        let next = service
            .get_next_stops_after("550", 10, instant(t))
            .await
            .unwrap();
        assert_eq!(next, [instant(t + 50), instant(t + 200), instant(t + 400)]);
    }

    #[tokio::test]
    async fn next_stops_sorts_out_of_order_feed() {
        let t = 1_609_459_200;
        // Feed order scrambled: a later departure listed first.
        let stop_times = stop_time_xml("T2", t + 200)
            + &stop_time_xml("T1", t + 50)
            + &stop_time_xml("T3", t + 400);
        let xml = response_xml(&route_xml("R1", "550"), &schedule_xml("R1", &stop_times));

        let fetcher = MockFetcher::new(xml);
        let service = service_for(&fetcher);

        let next = service
            .get_next_stops_after("550", 2, instant(t))
            .await
            .unwrap();
        assert_eq!(next, [instant(t + 50), instant(t + 200)]);
    }

    #[tokio::test]
    async fn exhausted_schedule_returns_empty() {
        let t = 1_609_459_200;
        let xml = response_xml(
            &route_xml("R1", "550"),
            &schedule_xml("R1", &stop_time_xml("T0", t - 100)),
        );

        let fetcher = MockFetcher::new(xml);
        let service = service_for(&fetcher);

        let next = service
            .get_next_stops_after("550", 3, instant(t))
            .await
            .unwrap();
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn unknown_route_short_name() {
        let xml = response_xml(&route_xml("R1", "550"), "");
        let fetcher = MockFetcher::new(xml);
        let service = service_for(&fetcher);

        let err = service.get_next_stops("nonexistent", 3).await.unwrap_err();
        assert!(matches!(err, ScheduleError::RouteNotFound(name) if name == "nonexistent"));
    }

    #[tokio::test]
    async fn route_without_schedule() {
        // Route decodes but no stopRouteSchedule carries its id.
        let xml = response_xml(&route_xml("R1", "550"), "");
        let fetcher = MockFetcher::new(xml);
        let service = service_for(&fetcher);

        let err = service.get_next_stops("550", 3).await.unwrap_err();
        assert!(matches!(err, ScheduleError::ScheduleNotFound(id) if id == "R1"));
    }

    #[tokio::test]
    async fn snapshot_is_idempotent_within_ttl() {
        let xml = response_xml(
            &route_xml("R1", "550"),
            &schedule_xml("R1", &stop_time_xml("T1", 1_609_459_200)),
        );
        let fetcher = MockFetcher::new(xml);
        let service = service_for(&fetcher);

        let first = service.get_stop_schedule().await.unwrap();
        let second = service.get_stop_schedule().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let fetcher = MockFetcher::failing();
        let service = service_for(&fetcher);

        let err = service.get_stop_schedule().await.unwrap_err();
        assert!(matches!(err, ScheduleError::Fetch(FetchError::Api { .. })));
    }
}
