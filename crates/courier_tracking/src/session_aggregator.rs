use fxhash::FxHashMap;
use jiff::Timestamp;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{
    error::{TrackingError, TrackingResult},
    geo_math::distance_meters,
    ids::{AgentId, DeliveryId},
    location_fix::LocationFix,
    tracking_session::{SessionSnapshot, TrackingSession},
};

/// Keeps the latest tracking session of every delivery, active or finalized.
#[derive(Default)]
pub struct SessionAggregator {
    sessions: RwLock<FxHashMap<DeliveryId, TrackingSession>>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        SessionAggregator::default()
    }

    /// Opens a session, replacing a finalized one of the same delivery.
    pub fn open(
        &self,
        delivery_id: &DeliveryId,
        agent_id: &AgentId,
        started_at: Timestamp,
    ) -> TrackingResult<SessionSnapshot> {
        let mut sessions = self.sessions.write();

        if sessions
            .get(delivery_id)
            .is_some_and(TrackingSession::is_active)
        {
            return Err(TrackingError::Conflict(format!(
                "delivery {delivery_id} already has an active tracking session"
            )));
        }

        let session = TrackingSession::new(delivery_id.clone(), agent_id.clone(), started_at);
        let snapshot = session.snapshot();
        sessions.insert(delivery_id.clone(), session);

        info!(%delivery_id, %agent_id, "Tracking session opened");

        Ok(snapshot)
    }

    /// Folds a newly accepted fix into the active session of its delivery.
    ///
    /// `previous` is the fix accepted just before `fix`. It only forms a leg
    /// when it was itself accepted during the session, so the first fix of a
    /// session anchors it without adding distance. Returns `None` when the
    /// delivery has no active session.
    pub fn on_fix_accepted(
        &self,
        delivery_id: &DeliveryId,
        previous: Option<&LocationFix>,
        fix: &LocationFix,
    ) -> Option<SessionSnapshot> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(delivery_id)
            .filter(|session| session.is_active())?;

        if let Some(previous) = previous
            && session.fix_count() > 0
        {
            let distance = distance_meters(&previous.position(), &fix.position());
            let elapsed = fix.timestamp().duration_since(previous.timestamp());
            session.record_leg(distance, elapsed);

            debug!(
                %delivery_id,
                leg_meters = distance.value(),
                leg_seconds = elapsed.as_secs_f64(),
                "Session leg recorded"
            );
        }

        session.count_fix();
        Some(session.snapshot())
    }

    /// Closes the active session. Finalizing twice is a caller bug and fails.
    pub fn finalize(
        &self,
        delivery_id: &DeliveryId,
        ended_at: Timestamp,
    ) -> TrackingResult<SessionSnapshot> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(delivery_id).ok_or_else(|| {
            TrackingError::NotFound(format!("tracking session of delivery {delivery_id}"))
        })?;

        if !session.is_active() {
            return Err(TrackingError::InvalidState(format!(
                "tracking session of delivery {delivery_id} is already finalized"
            )));
        }

        session.finish(ended_at);
        let snapshot = session.snapshot();

        info!(
            %delivery_id,
            distance_meters = snapshot.distance.value(),
            duration_seconds = snapshot.duration.as_secs_f64(),
            average_speed_kmh = snapshot.average_speed.value(),
            "Tracking session finalized"
        );

        Ok(snapshot)
    }

    /// Drops the active session without finalizing it.
    pub fn discard(&self, delivery_id: &DeliveryId) -> TrackingResult<()> {
        let mut sessions = self.sessions.write();
        match sessions.get(delivery_id) {
            Some(session) if session.is_active() => {
                sessions.remove(delivery_id);
                info!(%delivery_id, "Tracking session discarded");
                Ok(())
            }
            Some(_) => Err(TrackingError::InvalidState(format!(
                "tracking session of delivery {delivery_id} is already finalized"
            ))),
            None => Err(TrackingError::NotFound(format!(
                "tracking session of delivery {delivery_id}"
            ))),
        }
    }

    pub fn snapshot(&self, delivery_id: &DeliveryId) -> TrackingResult<SessionSnapshot> {
        self.sessions
            .read()
            .get(delivery_id)
            .map(TrackingSession::snapshot)
            .ok_or_else(|| {
                TrackingError::NotFound(format!("tracking session of delivery {delivery_id}"))
            })
    }

    pub fn is_active(&self, delivery_id: &DeliveryId) -> bool {
        self.sessions
            .read()
            .get(delivery_id)
            .is_some_and(TrackingSession::is_active)
    }
}
