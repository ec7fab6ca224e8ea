//! GeoJSON renderings of fixes and routes for map clients.

use geojson::{Feature, Geometry, JsonObject, Value};
use serde_json::json;

use crate::{location_fix::LocationFix, location_store::FixHistory, route::Route};

/// Point feature of a single fix.
pub fn fix_feature(fix: &LocationFix) -> Feature {
    let point: geo_types::Point<f64> = fix.position().into();

    let mut properties = JsonObject::new();
    properties.insert(String::from("delivery_id"), json!(fix.delivery_id()));
    properties.insert(String::from("agent_id"), json!(fix.agent_id()));
    properties.insert(String::from("status"), json!(fix.status()));
    properties.insert(
        String::from("speed"),
        json!(fix.speed().map(|speed| speed.value())),
    );
    properties.insert(String::from("timestamp"), json!(fix.timestamp()));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&point))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Line feature through origin, waypoints and destination of a route.
pub fn route_feature(route: &Route, progress_pct: Option<f64>) -> Feature {
    let line: geo_types::LineString<f64> = route
        .path()
        .iter()
        .map(geo_types::Coord::from)
        .collect();

    let mut properties = JsonObject::new();
    properties.insert(String::from("delivery_id"), json!(route.delivery_id()));
    properties.insert(String::from("distance"), json!(route.distance()));
    properties.insert(String::from("duration"), json!(route.duration().as_secs()));
    properties.insert(String::from("progress"), json!(progress_pct));
    properties.insert(String::from("status"), json!(route.status()));
    properties.insert(
        String::from("estimated_arrival"),
        json!(route.estimated_arrival()),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&line))),
        id: Some(geojson::feature::Id::String(route.id().to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Line through every recorded fix, `None` below two fixes.
pub fn trail_feature(history: &FixHistory) -> Option<Feature> {
    if history.len() < 2 {
        return None;
    }

    let line: geo_types::LineString<f64> = history
        .iter()
        .map(|fix| geo_types::Coord::from(&fix.position()))
        .collect();

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&line))),
        id: None,
        properties: None,
        foreign_members: None,
    })
}
