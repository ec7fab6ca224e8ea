use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use crate::{
    ids::{AgentId, DeliveryId},
    kmh::Kmh,
    meters::Meters,
};

/// Trip totals of one started route, from start until completion.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    delivery_id: DeliveryId,
    agent_id: AgentId,
    started_at: Timestamp,
    ended_at: Option<Timestamp>,
    distance: Meters,
    duration: SignedDuration,
    fix_count: u64,
    active: bool,
}

impl TrackingSession {
    pub(crate) fn new(delivery_id: DeliveryId, agent_id: AgentId, started_at: Timestamp) -> Self {
        TrackingSession {
            delivery_id,
            agent_id,
            started_at,
            ended_at: None,
            distance: Meters::ZERO,
            duration: SignedDuration::ZERO,
            fix_count: 0,
            active: true,
        }
    }

    /// Adds one leg between consecutive fixes; negative legs count as zero.
    pub(crate) fn record_leg(&mut self, distance: Meters, elapsed: SignedDuration) {
        self.distance += distance.non_negative();
        if elapsed.is_positive() {
            self.duration = self.duration.saturating_add(elapsed);
        }
    }

    pub(crate) fn count_fix(&mut self) {
        self.fix_count += 1;
    }

    pub(crate) fn finish(&mut self, ended_at: Timestamp) {
        self.ended_at = Some(ended_at);
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn fix_count(&self) -> u64 {
        self.fix_count
    }

    pub fn average_speed(&self) -> Kmh {
        self.distance / self.duration
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            delivery_id: self.delivery_id.clone(),
            agent_id: self.agent_id.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            distance: self.distance,
            duration: self.duration,
            average_speed: self.average_speed(),
            fix_count: self.fix_count,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub delivery_id: DeliveryId,
    pub agent_id: AgentId,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub distance: Meters,
    pub duration: SignedDuration,
    /// km/h
    pub average_speed: Kmh,
    pub fix_count: u64,
    pub active: bool,
}
