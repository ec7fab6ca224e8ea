#![allow(dead_code)]

use std::sync::Arc;

use courier_tracking::{
    clock::ManualClock,
    config::TrackingConfig,
    geopoint::GeoPoint,
    ids::{AgentId, DeliveryId, SubscriberId},
    ingest_coordinator::IngestCoordinator,
    location_fix::FixInput,
    meters::Meters,
    route::{RouteEndpoint, RoutePlan},
};
use jiff::{SignedDuration, Timestamp};

pub const ORIGIN: GeoPoint = GeoPoint::new(37.7749, -122.4194);
pub const DESTINATION: GeoPoint = GeoPoint::new(37.7849, -122.4094);

pub fn start_time() -> Timestamp {
    "2025-06-10T08:00:00Z".parse().unwrap()
}

pub fn at(seconds: i64) -> Timestamp {
    start_time()
        .checked_add(SignedDuration::from_secs(seconds))
        .unwrap()
}

pub fn delivery(id: &str) -> DeliveryId {
    DeliveryId::new(id).unwrap()
}

pub fn agent(id: &str) -> AgentId {
    AgentId::new(id).unwrap()
}

pub fn subscriber(id: &str) -> SubscriberId {
    SubscriberId::new(id).unwrap()
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub coordinator: IngestCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let coordinator = IngestCoordinator::builder(TrackingConfig::default())
            .with_clock(clock.clone())
            .build();

        Harness { clock, coordinator }
    }

    pub fn advance(&self, seconds: i64) {
        self.clock.advance(SignedDuration::from_secs(seconds));
    }

    /// Fix of `agent-1` for `delivery_id`, captured at the current clock time.
    pub fn fix(&self, delivery_id: &str, position: GeoPoint) -> FixInput {
        FixInput::new(delivery(delivery_id), agent("agent-1"), position)
    }
}

/// Origin to destination of the reference route, declared 5 km and 15 min.
pub fn reference_plan() -> RoutePlan {
    RoutePlan {
        origin: RouteEndpoint::new(ORIGIN, Some(String::from("Warehouse"))),
        destination: RouteEndpoint::new(DESTINATION, Some(String::from("Customer"))),
        waypoints: vec![],
        encoded_path: None,
        distance: Meters::new(5000.0),
        duration: SignedDuration::from_secs(900),
    }
}
