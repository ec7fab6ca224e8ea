use std::fmt::Display;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{TrackingError, TrackingResult},
    geopoint::GeoPoint,
    ids::{AgentId, DeliveryId},
    kmh::Kmh,
    meters::Meters,
};

/// Status reported by the agent device alongside a fix. Ordered along the
/// usual progression of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Idle,
    PickingUp,
    InTransit,
    Delivering,
    Completed,
}

impl FixStatus {
    pub fn is_regression_from(self, previous: FixStatus) -> bool {
        self < previous
    }
}

impl Display for FixStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FixStatus::Idle => "idle",
                FixStatus::PickingUp => "picking_up",
                FixStatus::InTransit => "in_transit",
                FixStatus::Delivering => "delivering",
                FixStatus::Completed => "completed",
            }
        )
    }
}

/// A position update as submitted by an agent device, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct FixInput {
    pub delivery_id: DeliveryId,
    pub agent_id: AgentId,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    /// km/h
    pub speed: Option<f64>,
    /// degrees clockwise from north
    pub heading: Option<f64>,
    pub status: Option<FixStatus>,
    pub metadata: Option<Map<String, Value>>,
    /// Capture time on the device, defaults to the time of receipt.
    pub timestamp: Option<Timestamp>,
}

impl FixInput {
    pub fn new(delivery_id: DeliveryId, agent_id: AgentId, position: GeoPoint) -> Self {
        FixInput {
            delivery_id,
            agent_id,
            latitude: position.lat,
            longitude: position.lng,
            accuracy: None,
            speed: None,
            heading: None,
            status: None,
            metadata: None,
            timestamp: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_status(mut self, status: FixStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// An accepted, immutable position record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFix {
    delivery_id: DeliveryId,
    agent_id: AgentId,
    latitude: f64,
    longitude: f64,
    accuracy: Option<Meters>,
    speed: Option<Kmh>,
    heading: Option<f64>,
    status: Option<FixStatus>,
    metadata: Map<String, Value>,
    timestamp: Timestamp,
}

impl LocationFix {
    /// Validates `input`, stamping it with `received_at` when the device sent
    /// no capture time.
    pub fn from_input(input: FixInput, received_at: Timestamp) -> TrackingResult<Self> {
        let fix = LocationFix {
            delivery_id: input.delivery_id,
            agent_id: input.agent_id,
            latitude: input.latitude,
            longitude: input.longitude,
            accuracy: input.accuracy.map(Meters::new),
            speed: input.speed.map(Kmh::new),
            heading: input.heading,
            status: input.status,
            metadata: input.metadata.unwrap_or_default(),
            timestamp: input.timestamp.unwrap_or(received_at),
        };

        fix.validate()?;
        Ok(fix)
    }

    pub fn validate(&self) -> TrackingResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(TrackingError::invalid_fix(
                "latitude",
                format!("must be within [-90, 90], got {}", self.latitude),
            ));
        }

        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(TrackingError::invalid_fix(
                "longitude",
                format!("must be within [-180, 180], got {}", self.longitude),
            ));
        }

        if let Some(accuracy) = self.accuracy
            && (!accuracy.is_finite() || accuracy.value() < 0.0)
        {
            return Err(TrackingError::invalid_fix(
                "accuracy",
                format!("must be a non-negative distance, got {}", accuracy.value()),
            ));
        }

        if let Some(speed) = self.speed
            && (!speed.value().is_finite() || speed.value() < 0.0)
        {
            return Err(TrackingError::invalid_fix(
                "speed",
                format!("must be non-negative, got {}", speed.value()),
            ));
        }

        if let Some(heading) = self.heading
            && (!heading.is_finite() || !(0.0..=360.0).contains(&heading))
        {
            return Err(TrackingError::invalid_fix(
                "heading",
                format!("must be within [0, 360], got {heading}"),
            ));
        }

        Ok(())
    }

    pub fn delivery_id(&self) -> &DeliveryId {
        &self.delivery_id
    }

    pub fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn accuracy(&self) -> Option<Meters> {
        self.accuracy
    }

    pub fn speed(&self) -> Option<Kmh> {
        self.speed
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    pub fn status(&self) -> Option<FixStatus> {
        self.status
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether the fix was captured no more than `threshold` before `now`.
    pub fn is_recent(&self, now: Timestamp, threshold: SignedDuration) -> bool {
        now.duration_since(self.timestamp) <= threshold
    }
}
