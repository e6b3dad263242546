//! GTFS-flavoured value objects decoded from the schedule XML.
//!
//! These follow the General Transit Feed Specification naming (routes, stop
//! times) but model only the fields the next-departure query consumes.

mod route;
mod stop_schedule;
mod stop_time;

pub use route::Route;
pub use stop_schedule::StopSchedule;
pub use stop_time::StopTime;
