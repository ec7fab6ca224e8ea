use std::sync::Arc;

use jiff::Timestamp;
use serde::Serialize;

use crate::{
    eta_engine::EtaUpdate,
    ids::DeliveryId,
    location_fix::{FixStatus, LocationFix},
    route::Route,
    tracking_session::SessionSnapshot,
};

/// Messages pushed to the observers of a delivery.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    LocationUpdate {
        fix: Arc<LocationFix>,
        #[serde(flatten)]
        eta: Option<EtaUpdate>,
    },
    RouteStarted {
        route: Route,
    },
    RouteCompleted {
        route: Route,
        session: SessionSnapshot,
    },
    RouteCancelled {
        route: Route,
    },
    StatusChanged {
        delivery_id: DeliveryId,
        status: FixStatus,
        previous: Option<FixStatus>,
        timestamp: Timestamp,
    },
}

impl TrackingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingEvent::LocationUpdate { .. } => "location_update",
            TrackingEvent::RouteStarted { .. } => "route_started",
            TrackingEvent::RouteCompleted { .. } => "route_completed",
            TrackingEvent::RouteCancelled { .. } => "route_cancelled",
            TrackingEvent::StatusChanged { .. } => "status_changed",
        }
    }
}
