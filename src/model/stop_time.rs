//! GTFS stop time.

use chrono::{DateTime, Utc};

use crate::decode::{AttributeMap, DecodeError, parse_bool};

/// One scheduled arrival/departure event for a trip at a stop.
///
/// The feed carries times as decimal millisecond-epoch strings with no
/// separator; they are truncated to whole seconds on decode (the trailing
/// three digits are dropped, not rounded).
///
/// `departure_instant >= arrival_instant` is assumed from the feed but not
/// validated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: String,
    /// Arrival as whole Unix seconds.
    pub arrival_time: i64,
    pub arrival_instant: DateTime<Utc>,
    /// Departure as whole Unix seconds.
    pub departure_time: i64,
    pub departure_instant: DateTime<Utc>,
    pub arrival_enabled: bool,
    pub departure_enabled: bool,
    pub service_id: Option<String>,
}

impl StopTime {
    /// Decode a `<scheduleStopTime>` element.
    pub fn from_element(node: roxmltree::Node<'_, '_>) -> Result<Self, DecodeError> {
        let mut attrs = AttributeMap::of(node);

        let trip_id = attrs.require("tripId")?;
        let arrival_raw = attrs.require("arrivalTime")?;
        let departure_raw = attrs.require("departureTime")?;
        let arrival_enabled = match attrs.optional("arrivalEnabled") {
            Some(text) => parse_bool("arrivalEnabled", &text)?,
            None => true,
        };
        let departure_enabled = match attrs.optional("departureEnabled") {
            Some(text) => parse_bool("departureEnabled", &text)?,
            None => true,
        };
        let service_id = attrs.optional("serviceId");

        attrs.finish()?;

        let arrival_time = truncate_epoch_millis("arrivalTime", &arrival_raw)?;
        let departure_time = truncate_epoch_millis("departureTime", &departure_raw)?;

        Ok(Self {
            trip_id,
            arrival_time,
            arrival_instant: instant_from_secs("arrivalTime", &arrival_raw, arrival_time)?,
            departure_time,
            departure_instant: instant_from_secs("departureTime", &departure_raw, departure_time)?,
            arrival_enabled,
            departure_enabled,
            service_id,
        })
    }
}

/// Truncate a millisecond-epoch digit string to whole Unix seconds.
///
/// The last three characters are dropped, which for digit strings equals
/// `floor(millis / 1000)`. Strings shorter than four characters cannot be
/// truncated and fail, as does anything containing a non-digit.
pub fn truncate_epoch_millis(tag: &'static str, value: &str) -> Result<i64, DecodeError> {
    if value.len() < 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::InvalidTime {
            tag,
            value: value.to_string(),
        });
    }

    value[..value.len() - 3]
        .parse()
        .map_err(|_| DecodeError::InvalidTime {
            tag,
            value: value.to_string(),
        })
}

fn instant_from_secs(
    tag: &'static str,
    raw: &str,
    secs: i64,
) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| DecodeError::InvalidTime {
        tag,
        value: raw.to_string(),
    })
}
