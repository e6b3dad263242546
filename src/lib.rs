//! OneBusAway stop-schedule client.
//!
//! Fetches the `schedule-for-stop` XML for one physical stop, caches the raw
//! response with a TTL, decodes it into GTFS-flavoured value objects, and
//! answers: "what are the next N departures for a given route at this stop?"

pub mod cache;
pub mod decode;
pub mod model;
pub mod oba;
pub mod service;
