use jiff::{SignedDuration, Timestamp};

use crate::{
    geopoint::GeoPoint,
    ids::{AgentId, DeliveryId},
    location_fix::{FixInput, LocationFix},
    meters::Meters,
    route::{RouteEndpoint, RoutePlan},
};

pub const ORIGIN: GeoPoint = GeoPoint::new(37.7749, -122.4194);
pub const DESTINATION: GeoPoint = GeoPoint::new(37.7849, -122.4094);

pub fn delivery(id: &str) -> DeliveryId {
    DeliveryId::new(id).unwrap()
}

pub fn agent(id: &str) -> AgentId {
    AgentId::new(id).unwrap()
}

/// Seconds after a fixed reference instant.
pub fn timestamp(seconds: i64) -> Timestamp {
    let base: Timestamp = "2025-06-10T08:00:00Z".parse().unwrap();
    base.checked_add(SignedDuration::from_secs(seconds)).unwrap()
}

pub fn fix_at(delivery_id: &str, position: GeoPoint, seconds: i64) -> LocationFix {
    LocationFix::from_input(
        FixInput::new(delivery(delivery_id), agent("agent-1"), position)
            .with_timestamp(timestamp(seconds)),
        timestamp(seconds),
    )
    .unwrap()
}

pub fn moving_fix_at(
    delivery_id: &str,
    position: GeoPoint,
    speed_kmh: f64,
    seconds: i64,
) -> LocationFix {
    LocationFix::from_input(
        FixInput::new(delivery(delivery_id), agent("agent-1"), position)
            .with_speed(speed_kmh)
            .with_timestamp(timestamp(seconds)),
        timestamp(seconds),
    )
    .unwrap()
}

pub fn plan(distance: f64, duration_secs: i64) -> RoutePlan {
    RoutePlan {
        origin: RouteEndpoint::new(ORIGIN, Some(String::from("Warehouse"))),
        destination: RouteEndpoint::new(DESTINATION, Some(String::from("Customer"))),
        waypoints: vec![],
        encoded_path: None,
        distance: Meters::new(distance),
        duration: SignedDuration::from_secs(duration_secs),
    }
}
