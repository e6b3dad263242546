//! Per-route schedule at one physical stop.

use crate::decode::DecodeError;
use crate::model::StopTime;

/// All the scheduled stop times one route has at a specific stop.
///
/// This is a derived aggregate rather than a GTFS file entity: the feed
/// groups a stop's schedule by route, and this mirrors that grouping without
/// distinguishing travel direction.
///
/// `stops` preserves feed order. The feed emits stop times chronologically,
/// but that is a property of the feed, not something enforced here; the
/// next-departure query sorts defensively before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopSchedule {
    pub route_id: String,
    pub stops: Vec<StopTime>,
}

impl StopSchedule {
    /// Decode a `<stopRouteSchedule>` element.
    ///
    /// The `routeId` child is required. Every other child is a grouping
    /// container (direction schedules) and is searched for
    /// `<scheduleStopTimes>` collections; each of their element children
    /// decodes to one [`StopTime`], appended in document order. A schedule
    /// with no stop times is valid.
    pub fn from_element(node: roxmltree::Node<'_, '_>) -> Result<Self, DecodeError> {
        let mut route_id = None;
        let mut stops = Vec::new();

        for child in node.children().filter(roxmltree::Node::is_element) {
            if child.tag_name().name() == "routeId" {
                route_id = child.text().map(str::trim).filter(|t| !t.is_empty()).map(String::from);
                continue;
            }

            for collection in child
                .descendants()
                .filter(|n| n.is_element() && n.tag_name().name() == "scheduleStopTimes")
            {
                for stop_node in collection.children().filter(roxmltree::Node::is_element) {
                    stops.push(StopTime::from_element(stop_node)?);
                }
            }
        }

        let route_id = route_id.ok_or_else(|| DecodeError::MissingField {
            element: node.tag_name().name().to_string(),
            tag: "routeId",
        })?;

        Ok(Self { route_id, stops })
    }
}
