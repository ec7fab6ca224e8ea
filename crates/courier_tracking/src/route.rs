use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{TrackingError, TrackingResult},
    geopoint::GeoPoint,
    ids::{AgentId, DeliveryId},
    meters::Meters,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEndpoint {
    pub point: GeoPoint,
    pub label: Option<String>,
}

impl RouteEndpoint {
    pub fn new(point: GeoPoint, label: Option<String>) -> Self {
        RouteEndpoint { point, label }
    }
}

/// An externally computed route handed to the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutePlan {
    pub origin: RouteEndpoint,
    pub destination: RouteEndpoint,
    #[serde(default)]
    pub waypoints: Vec<GeoPoint>,
    /// Opaque polyline for map rendering, never decoded.
    pub encoded_path: Option<String>,
    pub distance: Meters,
    pub duration: SignedDuration,
}

impl RoutePlan {
    pub fn validate(&self) -> TrackingResult<()> {
        if !self.origin.point.is_valid() {
            return Err(TrackingError::InvalidInput(String::from(
                "route origin is not a valid position",
            )));
        }

        if !self.destination.point.is_valid() {
            return Err(TrackingError::InvalidInput(String::from(
                "route destination is not a valid position",
            )));
        }

        if let Some(index) = self.waypoints.iter().position(|point| !point.is_valid()) {
            return Err(TrackingError::InvalidInput(format!(
                "waypoint {index} is not a valid position"
            )));
        }

        if !self.distance.is_finite() || self.distance.value() < 0.0 {
            return Err(TrackingError::InvalidInput(String::from(
                "route distance must be a non-negative number of meters",
            )));
        }

        if self.duration.is_negative() {
            return Err(TrackingError::InvalidInput(String::from(
                "route duration must not be negative",
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    id: Uuid,
    delivery_id: DeliveryId,
    agent_id: AgentId,
    origin: RouteEndpoint,
    destination: RouteEndpoint,
    waypoints: Vec<GeoPoint>,
    encoded_path: Option<String>,
    distance: Meters,
    duration: SignedDuration,
    estimated_arrival: Timestamp,
    actual_arrival: Option<Timestamp>,
    created_at: Timestamp,
    started_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    cancelled_at: Option<Timestamp>,
    status: RouteStatus,
    active: bool,
}

impl Route {
    pub(crate) fn new(
        delivery_id: DeliveryId,
        agent_id: AgentId,
        plan: RoutePlan,
        now: Timestamp,
    ) -> TrackingResult<Self> {
        plan.validate()?;

        let estimated_arrival = now
            .checked_add(plan.duration)
            .map_err(|error| TrackingError::InvalidInput(error.to_string()))?;

        Ok(Route {
            id: Uuid::new_v4(),
            delivery_id,
            agent_id,
            origin: plan.origin,
            destination: plan.destination,
            waypoints: plan.waypoints,
            encoded_path: plan.encoded_path,
            distance: plan.distance,
            duration: plan.duration,
            estimated_arrival,
            actual_arrival: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            status: RouteStatus::Planned,
            active: false,
        })
    }

    fn set_status(&mut self, status: RouteStatus) {
        self.status = status;
        self.active = status == RouteStatus::Active;
    }

    fn invalid_transition(&self, action: &str) -> TrackingError {
        TrackingError::InvalidState(format!(
            "cannot {action} route of delivery {} while it is {:?}",
            self.delivery_id, self.status
        ))
    }

    pub(crate) fn start(&mut self, now: Timestamp) -> TrackingResult<()> {
        if self.status != RouteStatus::Planned {
            return Err(self.invalid_transition("start"));
        }

        self.set_status(RouteStatus::Active);
        self.started_at = Some(now);
        if let Ok(estimated_arrival) = now.checked_add(self.duration) {
            self.estimated_arrival = estimated_arrival;
        }

        Ok(())
    }

    pub(crate) fn ensure_active(&self, action: &str) -> TrackingResult<()> {
        if self.status == RouteStatus::Active {
            Ok(())
        } else {
            Err(self.invalid_transition(action))
        }
    }

    pub(crate) fn complete(&mut self, now: Timestamp, actual_arrival: Timestamp) -> TrackingResult<()> {
        self.ensure_active("complete")?;

        self.set_status(RouteStatus::Completed);
        self.completed_at = Some(now);
        self.actual_arrival = Some(actual_arrival);

        Ok(())
    }

    pub(crate) fn cancel(&mut self, now: Timestamp) -> TrackingResult<()> {
        self.ensure_active("cancel")?;

        self.set_status(RouteStatus::Cancelled);
        self.cancelled_at = Some(now);

        Ok(())
    }

    pub(crate) fn set_estimated_arrival(&mut self, estimated_arrival: Timestamp) {
        self.estimated_arrival = estimated_arrival;
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        &self.delivery_id
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn origin(&self) -> &RouteEndpoint {
        &self.origin
    }

    pub fn destination(&self) -> &RouteEndpoint {
        &self.destination
    }

    pub fn waypoints(&self) -> &[GeoPoint] {
        &self.waypoints
    }

    pub fn encoded_path(&self) -> Option<&str> {
        self.encoded_path.as_deref()
    }

    pub fn distance(&self) -> Meters {
        self.distance
    }

    pub fn duration(&self) -> SignedDuration {
        self.duration
    }

    pub fn estimated_arrival(&self) -> Timestamp {
        self.estimated_arrival
    }

    pub fn actual_arrival(&self) -> Option<Timestamp> {
        self.actual_arrival
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<Timestamp> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<Timestamp> {
        self.cancelled_at
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Origin, waypoints and destination in travel order.
    pub fn path(&self) -> Vec<GeoPoint> {
        let mut path = Vec::with_capacity(self.waypoints.len() + 2);
        path.push(self.origin.point);
        path.extend_from_slice(&self.waypoints);
        path.push(self.destination.point);
        path
    }
}
