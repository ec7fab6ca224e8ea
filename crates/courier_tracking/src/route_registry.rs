use std::sync::Arc;

use fxhash::FxHashMap;
use jiff::Timestamp;
use parking_lot::RwLock;
use tracing::info;

use crate::{
    error::{TrackingError, TrackingResult},
    ids::{AgentId, DeliveryId},
    route::{Route, RoutePlan},
    session_aggregator::SessionAggregator,
    tracking_session::SessionSnapshot,
};

/// Current route of every delivery, with at most one active at a time.
///
/// Lifecycle calls that open or close a tracking session hold the route table
/// while they do, so the route and its session always change together. Locks
/// are taken routes first, sessions second.
pub struct RouteRegistry {
    routes: RwLock<FxHashMap<DeliveryId, Route>>,
    sessions: Arc<SessionAggregator>,
}

impl RouteRegistry {
    pub fn new(sessions: Arc<SessionAggregator>) -> Self {
        RouteRegistry {
            routes: RwLock::new(FxHashMap::default()),
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionAggregator> {
        &self.sessions
    }

    /// Registers a planned route. Fails with `Conflict` while the delivery
    /// still has an active one; any other previous route is replaced.
    pub fn create(
        &self,
        delivery_id: &DeliveryId,
        agent_id: &AgentId,
        plan: RoutePlan,
        now: Timestamp,
    ) -> TrackingResult<Route> {
        let mut routes = self.routes.write();

        if routes.get(delivery_id).is_some_and(Route::is_active) {
            return Err(TrackingError::Conflict(format!(
                "delivery {delivery_id} already has an active route"
            )));
        }

        let route = Route::new(delivery_id.clone(), agent_id.clone(), plan, now)?;
        routes.insert(delivery_id.clone(), route.clone());

        info!(
            %delivery_id,
            %agent_id,
            route_id = %route.id(),
            distance_meters = route.distance().value(),
            duration_seconds = route.duration().as_secs(),
            "Route created"
        );

        Ok(route)
    }

    pub fn start(&self, delivery_id: &DeliveryId, now: Timestamp) -> TrackingResult<Route> {
        let mut routes = self.routes.write();
        let route = routes
            .get_mut(delivery_id)
            .ok_or_else(|| route_not_found(delivery_id))?;

        let mut started = route.clone();
        started.start(now)?;
        self.sessions.open(delivery_id, started.agent_id(), now)?;
        *route = started.clone();

        info!(%delivery_id, route_id = %started.id(), "Route started");

        Ok(started)
    }

    /// Completes the active route and finalizes its session.
    pub fn complete(
        &self,
        delivery_id: &DeliveryId,
        actual_arrival: Option<Timestamp>,
        now: Timestamp,
    ) -> TrackingResult<(Route, SessionSnapshot)> {
        let mut routes = self.routes.write();
        let route = routes
            .get_mut(delivery_id)
            .ok_or_else(|| route_not_found(delivery_id))?;

        route.ensure_active("complete")?;
        let session = self.sessions.finalize(delivery_id, now)?;
        route.complete(now, actual_arrival.unwrap_or(now))?;

        info!(
            %delivery_id,
            route_id = %route.id(),
            distance_meters = session.distance.value(),
            "Route completed"
        );

        Ok((route.clone(), session))
    }

    /// Cancels the active route. Its session is dropped, not finalized.
    pub fn cancel(&self, delivery_id: &DeliveryId, now: Timestamp) -> TrackingResult<Route> {
        let mut routes = self.routes.write();
        let route = routes
            .get_mut(delivery_id)
            .ok_or_else(|| route_not_found(delivery_id))?;

        route.ensure_active("cancel")?;
        match self.sessions.discard(delivery_id) {
            // A session can only be missing if it was already discarded.
            Ok(()) | Err(TrackingError::NotFound(_)) => {}
            Err(error) => return Err(error),
        }
        route.cancel(now)?;

        info!(%delivery_id, route_id = %route.id(), "Route cancelled");

        Ok(route.clone())
    }

    pub fn active_route(&self, delivery_id: &DeliveryId) -> TrackingResult<Route> {
        self.routes
            .read()
            .get(delivery_id)
            .filter(|route| route.is_active())
            .cloned()
            .ok_or_else(|| {
                TrackingError::NotFound(format!("active route of delivery {delivery_id}"))
            })
    }

    /// Current route of the delivery, whatever its status.
    pub fn route(&self, delivery_id: &DeliveryId) -> TrackingResult<Route> {
        self.routes
            .read()
            .get(delivery_id)
            .cloned()
            .ok_or_else(|| route_not_found(delivery_id))
    }

    pub fn active_routes(&self) -> Vec<Route> {
        let mut active: Vec<Route> = self
            .routes
            .read()
            .values()
            .filter(|route| route.is_active())
            .cloned()
            .collect();

        active.sort_by_key(|route| route.started_at());
        active
    }

    /// Runs `f` on the active route of the delivery, if any.
    pub(crate) fn update_active<R>(
        &self,
        delivery_id: &DeliveryId,
        f: impl FnOnce(&mut Route) -> R,
    ) -> Option<R> {
        self.routes
            .write()
            .get_mut(delivery_id)
            .filter(|route| route.is_active())
            .map(f)
    }
}

fn route_not_found(delivery_id: &DeliveryId) -> TrackingError {
    TrackingError::NotFound(format!("route of delivery {delivery_id}"))
}
