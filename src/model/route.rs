//! GTFS route.

use crate::decode::{AttributeMap, DecodeError, parse_int};

/// One transit route, as described by the feed.
///
/// `short_name` is the lookup key for queries and is assumed unique among
/// the routes loaded for a stop; when the feed repeats a short name, the
/// last decoded route wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub id: String,
    /// Short route name, e.g. "550" or "D".
    pub short_name: String,
    /// Long route name, e.g. "Bellevue - Seattle".
    pub long_name: Option<String>,
    pub description: Option<String>,
    /// GTFS route type. Defaults to 3 (bus).
    pub route_type: i32,
    pub url: Option<String>,
    /// Agency the route belongs to. Defaults to 1.
    pub agency_id: i64,
}

impl Route {
    /// Decode a `<route>` element.
    ///
    /// Requires `id` and `shortName`; tolerates the absence of every other
    /// declared tag; rejects tags outside the declared set.
    pub fn from_element(node: roxmltree::Node<'_, '_>) -> Result<Self, DecodeError> {
        let mut attrs = AttributeMap::of(node);

        let id = attrs.require("id")?;
        let short_name = attrs.require("shortName")?;
        let long_name = attrs.optional("longName");
        let description = attrs.optional("description");
        let route_type = match attrs.optional("type") {
            Some(text) => parse_int("type", &text)?,
            None => 3,
        };
        let url = attrs.optional("url");
        let agency_id = match attrs.optional("agencyId") {
            Some(text) => parse_int("agencyId", &text)?,
            None => 1,
        };

        attrs.finish()?;

        Ok(Self {
            id,
            short_name,
            long_name,
            description,
            route_type,
            url,
            agency_id,
        })
    }
}
