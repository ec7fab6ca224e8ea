//! Entry point for everything that changes the state of a delivery.
//!
//! Fix submissions and route lifecycle calls for one delivery run one at a
//! time under that delivery's lock, while different deliveries proceed in
//! parallel. Events are handed to the broadcaster before the lock is
//! released, which keeps them in acceptance order; fan-out itself happens on
//! the broadcaster's dispatcher.

use std::sync::Arc;

use fxhash::FxHashMap;
use jiff::Timestamp;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    access::{AllowAll, SubscriptionAuthorizer},
    broadcaster::{Broadcaster, Subscription},
    clock::{Clock, SystemClock},
    config::TrackingConfig,
    delivery_locks::DeliveryLocks,
    error::{TrackingError, TrackingResult},
    eta_engine::{EtaEngine, EtaUpdate},
    events::TrackingEvent,
    ids::{AgentId, DeliveryId, SubscriberId},
    location_fix::{FixInput, FixStatus, LocationFix},
    location_store::{FixHistory, FixPage, LocationStore, TimeRange},
    route::{Route, RoutePlan},
    route_registry::RouteRegistry,
    session_aggregator::SessionAggregator,
    tracking_session::SessionSnapshot,
};

/// The accepted fix, with progress along the active route if there is one.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub fix: Arc<LocationFix>,
    #[serde(flatten)]
    pub eta: Option<EtaUpdate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteCompletion {
    pub route: Route,
    pub session: SessionSnapshot,
}

pub struct IngestCoordinatorBuilder {
    config: TrackingConfig,
    clock: Arc<dyn Clock>,
    authorizer: Arc<dyn SubscriptionAuthorizer>,
    store: Option<Arc<LocationStore>>,
}

impl IngestCoordinatorBuilder {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn SubscriptionAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_store(mut self, store: Arc<LocationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Must be called inside a Tokio runtime, the broadcaster spawns its
    /// dispatcher here.
    pub fn build(self) -> IngestCoordinator {
        let sessions = Arc::new(SessionAggregator::new());

        IngestCoordinator {
            store: self.store.unwrap_or_default(),
            routes: RouteRegistry::new(sessions),
            eta: EtaEngine::new(self.config.min_moving_speed),
            broadcaster: Broadcaster::new(self.config.subscriber_buffer),
            locks: DeliveryLocks::new(),
            statuses: Mutex::new(FxHashMap::default()),
            clock: self.clock,
            authorizer: self.authorizer,
            config: self.config,
        }
    }
}

pub struct IngestCoordinator {
    store: Arc<LocationStore>,
    routes: RouteRegistry,
    eta: EtaEngine,
    broadcaster: Broadcaster,
    locks: DeliveryLocks,
    /// Last status reported for each delivery.
    statuses: Mutex<FxHashMap<DeliveryId, FixStatus>>,
    clock: Arc<dyn Clock>,
    authorizer: Arc<dyn SubscriptionAuthorizer>,
    config: TrackingConfig,
}

impl IngestCoordinator {
    pub fn builder(config: TrackingConfig) -> IngestCoordinatorBuilder {
        IngestCoordinatorBuilder {
            config,
            clock: Arc::new(SystemClock),
            authorizer: Arc::new(AllowAll),
            store: None,
        }
    }

    /// Validates, stores and processes one fix.
    ///
    /// A rejected fix leaves no trace: it is not stored, does not move the
    /// route or session and is not broadcast.
    pub async fn submit(&self, input: FixInput) -> TrackingResult<SubmitOutcome> {
        let fix = LocationFix::from_input(input, self.clock.now())?;
        let delivery_id = fix.delivery_id().clone();

        let _guard = self.locks.lock(&delivery_id).await;
        let now = self.clock.now();

        let previous = self.store.latest(&delivery_id).ok();
        let fix = self.store.append(fix)?;

        let eta = self.routes.update_active(&delivery_id, |route| {
            if route.agent_id() != fix.agent_id() {
                warn!(
                    %delivery_id,
                    route_agent = %route.agent_id(),
                    fix_agent = %fix.agent_id(),
                    "Fix submitted by an agent other than the route's"
                );
            }

            self.eta.recompute(route, &fix, now)
        });

        self.routes
            .sessions()
            .on_fix_accepted(&delivery_id, previous.as_deref(), &fix);

        debug!(
            %delivery_id,
            progress_pct = eta.map(|eta| eta.progress_pct),
            "Fix accepted"
        );

        self.broadcaster.publish(
            &delivery_id,
            TrackingEvent::LocationUpdate {
                fix: Arc::clone(&fix),
                eta,
            },
        );

        if let Some(status) = fix.status() {
            self.track_status(&delivery_id, status, fix.timestamp());
        }

        Ok(SubmitOutcome { fix, eta })
    }

    fn track_status(&self, delivery_id: &DeliveryId, status: FixStatus, timestamp: Timestamp) {
        let previous = self.statuses.lock().insert(delivery_id.clone(), status);
        if previous == Some(status) {
            return;
        }

        if let Some(previous) = previous
            && status.is_regression_from(previous)
        {
            warn!(%delivery_id, %previous, %status, "Delivery status went backwards");
        }

        self.broadcaster.publish(
            delivery_id,
            TrackingEvent::StatusChanged {
                delivery_id: delivery_id.clone(),
                status,
                previous,
                timestamp,
            },
        );
    }

    pub async fn create_route(
        &self,
        delivery_id: &DeliveryId,
        agent_id: &AgentId,
        plan: RoutePlan,
    ) -> TrackingResult<Route> {
        let _guard = self.locks.lock(delivery_id).await;
        self.routes
            .create(delivery_id, agent_id, plan, self.clock.now())
    }

    pub async fn start_route(&self, delivery_id: &DeliveryId) -> TrackingResult<Route> {
        let _guard = self.locks.lock(delivery_id).await;
        let route = self.routes.start(delivery_id, self.clock.now())?;

        self.broadcaster.publish(
            delivery_id,
            TrackingEvent::RouteStarted {
                route: route.clone(),
            },
        );

        Ok(route)
    }

    /// Completes the active route; `actual_arrival` defaults to now.
    pub async fn complete_route(
        &self,
        delivery_id: &DeliveryId,
        actual_arrival: Option<Timestamp>,
    ) -> TrackingResult<RouteCompletion> {
        let _guard = self.locks.lock(delivery_id).await;
        let (route, session) = self
            .routes
            .complete(delivery_id, actual_arrival, self.clock.now())?;
        self.statuses.lock().remove(delivery_id);

        self.broadcaster.publish(
            delivery_id,
            TrackingEvent::RouteCompleted {
                route: route.clone(),
                session: session.clone(),
            },
        );

        Ok(RouteCompletion { route, session })
    }

    pub async fn cancel_route(&self, delivery_id: &DeliveryId) -> TrackingResult<Route> {
        let _guard = self.locks.lock(delivery_id).await;
        let route = self.routes.cancel(delivery_id, self.clock.now())?;
        self.statuses.lock().remove(delivery_id);

        self.broadcaster.publish(
            delivery_id,
            TrackingEvent::RouteCancelled {
                route: route.clone(),
            },
        );

        Ok(route)
    }

    pub fn latest_fix(&self, delivery_id: &DeliveryId) -> TrackingResult<Arc<LocationFix>> {
        self.store.latest(delivery_id)
    }

    pub fn fix_history(&self, delivery_id: &DeliveryId, range: TimeRange) -> FixHistory {
        self.store.history(delivery_id, range)
    }

    pub fn fix_history_page(
        &self,
        delivery_id: &DeliveryId,
        range: TimeRange,
        offset: usize,
        limit: usize,
    ) -> FixPage {
        self.store.history_page(delivery_id, range, offset, limit)
    }

    pub fn active_route(&self, delivery_id: &DeliveryId) -> TrackingResult<Route> {
        self.routes.active_route(delivery_id)
    }

    pub fn route(&self, delivery_id: &DeliveryId) -> TrackingResult<Route> {
        self.routes.route(delivery_id)
    }

    pub fn active_routes(&self) -> Vec<Route> {
        self.routes.active_routes()
    }

    pub fn session_snapshot(&self, delivery_id: &DeliveryId) -> TrackingResult<SessionSnapshot> {
        self.routes.sessions().snapshot(delivery_id)
    }

    pub fn is_recent(&self, fix: &LocationFix) -> bool {
        fix.is_recent(self.clock.now(), self.config.recent_threshold)
    }

    /// Progress of the latest fix against the active route, computed on the
    /// spot. Nothing is stored.
    pub fn progress(&self, delivery_id: &DeliveryId) -> Option<EtaUpdate> {
        let fix = self.store.latest(delivery_id).ok()?;
        let route = self.routes.active_route(delivery_id).ok()?;
        Some(self.eta.estimate(&route, &fix, self.clock.now()))
    }

    /// A `location_update` for the latest fix, for observers catching up.
    pub fn latest_update(&self, delivery_id: &DeliveryId) -> TrackingResult<TrackingEvent> {
        let fix = self.store.latest(delivery_id)?;
        let eta = self
            .routes
            .active_route(delivery_id)
            .ok()
            .map(|route| self.eta.estimate(&route, &fix, self.clock.now()));

        Ok(TrackingEvent::LocationUpdate { fix, eta })
    }

    /// Subscribes to the events of a delivery once the authorizer agrees.
    pub fn subscribe(
        &self,
        delivery_id: &DeliveryId,
        subscriber_id: &SubscriberId,
    ) -> TrackingResult<Subscription> {
        if !self.authorizer.may_observe(subscriber_id, delivery_id) {
            warn!(%delivery_id, %subscriber_id, "Subscription refused");
            return Err(TrackingError::Unauthorized {
                subscriber: subscriber_id.clone(),
                delivery: delivery_id.clone(),
            });
        }

        Ok(self.broadcaster.subscribe(delivery_id, subscriber_id))
    }

    pub fn unsubscribe(&self, delivery_id: &DeliveryId, subscriber_id: &SubscriberId) -> bool {
        self.broadcaster.unsubscribe(delivery_id, subscriber_id)
    }

    pub fn subscriber_count(&self, delivery_id: &DeliveryId) -> usize {
        self.broadcaster.subscriber_count(delivery_id)
    }

    pub fn store(&self) -> &Arc<LocationStore> {
        &self.store
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        clock::ManualClock,
        geopoint::GeoPoint,
        meters::Meters,
        route::RouteEndpoint,
        test_utils::{DESTINATION, ORIGIN, agent, delivery, plan, timestamp},
    };

    fn coordinator(clock: Arc<ManualClock>) -> IngestCoordinator {
        IngestCoordinator::builder(TrackingConfig::default())
            .with_clock(clock)
            .build()
    }

    fn input(delivery_id: &str, agent_id: &str) -> FixInput {
        FixInput::new(delivery(delivery_id), agent(agent_id), ORIGIN)
    }

    async fn next(subscription: &mut Subscription) -> Arc<TrackingEvent> {
        timeout(Duration::from_secs(1), subscription.recv())
            .await
            .expect("timed out waiting for event")
            .expect("subscription closed")
    }

    #[tokio::test]
    async fn should_stamp_fix_with_clock_time() {
        let clock = Arc::new(ManualClock::new(timestamp(42)));
        let coordinator = coordinator(clock);

        let outcome = coordinator.submit(input("d-1", "agent-1")).await.unwrap();
        assert_eq!(outcome.fix.timestamp(), timestamp(42));
        assert!(outcome.eta.is_none());
        assert!(coordinator.is_recent(&outcome.fix));
    }

    #[tokio::test]
    async fn rejected_fix_is_not_broadcast() {
        let clock = Arc::new(ManualClock::new(timestamp(0)));
        let coordinator = coordinator(clock);
        let mut subscription = coordinator
            .subscribe(&delivery("d-1"), &SubscriberId::new("customer").unwrap())
            .unwrap();

        let mut invalid = input("d-1", "agent-1");
        invalid.longitude = 181.0;
        assert!(matches!(
            coordinator.submit(invalid).await,
            Err(TrackingError::InvalidFix { field: "longitude", .. })
        ));

        coordinator.submit(input("d-1", "agent-1")).await.unwrap();
        let event = next(&mut subscription).await;
        assert_eq!(event.kind(), "location_update");
        assert!(subscription.try_recv().is_none());
        assert_eq!(coordinator.store().fix_count(&delivery("d-1")), 1);
    }

    #[tokio::test]
    async fn should_emit_status_changes_once() {
        let clock = Arc::new(ManualClock::new(timestamp(0)));
        let coordinator = coordinator(clock);
        let mut subscription = coordinator
            .subscribe(&delivery("d-1"), &SubscriberId::new("admin").unwrap())
            .unwrap();

        for status in [FixStatus::InTransit, FixStatus::InTransit, FixStatus::PickingUp] {
            coordinator
                .submit(input("d-1", "agent-1").with_status(status))
                .await
                .unwrap();
        }

        let kinds: Vec<_> = [
            next(&mut subscription).await,
            next(&mut subscription).await,
            next(&mut subscription).await,
            next(&mut subscription).await,
            next(&mut subscription).await,
        ]
        .iter()
        .map(|event| event.kind())
        .collect();

        assert_eq!(
            kinds,
            vec![
                "location_update",
                "status_changed",
                "location_update",
                "location_update",
                "status_changed"
            ]
        );
    }

    #[tokio::test]
    async fn should_refuse_unauthorized_subscriber() {
        let coordinator = IngestCoordinator::builder(TrackingConfig::default())
            .with_authorizer(Arc::new(|subscriber: &SubscriberId, _: &DeliveryId| {
                subscriber.as_str() == "admin"
            }))
            .build();

        assert!(
            coordinator
                .subscribe(&delivery("d-1"), &SubscriberId::new("admin").unwrap())
                .is_ok()
        );
        assert!(matches!(
            coordinator.subscribe(&delivery("d-1"), &SubscriberId::new("stranger").unwrap()),
            Err(TrackingError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn fixes_for_active_route_update_eta() {
        let clock = Arc::new(ManualClock::new(timestamp(0)));
        let coordinator = coordinator(Arc::clone(&clock));

        coordinator
            .create_route(&delivery("d-1"), &agent("agent-1"), plan(5000.0, 900))
            .await
            .unwrap();
        coordinator.start_route(&delivery("d-1")).await.unwrap();

        clock.advance(jiff::SignedDuration::from_secs(30));
        let outcome = coordinator
            .submit(input("d-1", "agent-2").with_speed(36.0))
            .await
            .unwrap();

        let eta = outcome.eta.unwrap();
        let remaining = ORIGIN.haversine_distance(&DESTINATION);
        assert!((eta.remaining.value() - remaining).abs() < 1e-6);
        // 36 km/h is 10 m/s.
        let travel = eta.estimated_arrival.duration_since(timestamp(30));
        assert!((travel.as_secs_f64() - remaining / 10.0).abs() < 1e-3);
        assert_eq!(
            coordinator.active_route(&delivery("d-1")).unwrap().estimated_arrival(),
            eta.estimated_arrival
        );
        assert_eq!(coordinator.progress(&delivery("d-1")).unwrap().remaining, eta.remaining);
    }

    #[tokio::test]
    async fn latest_update_reports_current_fix() {
        let coordinator = coordinator(Arc::new(ManualClock::new(timestamp(0))));
        assert!(matches!(
            coordinator.latest_update(&delivery("d-1")),
            Err(TrackingError::NotFound(_))
        ));

        let position = GeoPoint::new(10.0, 20.0);
        coordinator
            .submit(FixInput::new(delivery("d-1"), agent("agent-1"), position))
            .await
            .unwrap();

        match coordinator.latest_update(&delivery("d-1")).unwrap() {
            TrackingEvent::LocationUpdate { fix, eta } => {
                assert_eq!(fix.position(), position);
                assert!(eta.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn antipodal_fix_yields_finite_eta() {
        let clock = Arc::new(ManualClock::new(timestamp(0)));
        let coordinator = coordinator(Arc::clone(&clock));
        let destination = GeoPoint::new(87.5, 0.0);

        coordinator
            .create_route(
                &delivery("d-1"),
                &agent("agent-1"),
                RoutePlan {
                    origin: RouteEndpoint::new(GeoPoint::new(-87.5, -180.0), None),
                    destination: RouteEndpoint::new(destination, None),
                    waypoints: vec![],
                    encoded_path: None,
                    distance: Meters::new(20_000_000.0),
                    duration: jiff::SignedDuration::from_hours(24),
                },
            )
            .await
            .unwrap();
        coordinator.start_route(&delivery("d-1")).await.unwrap();

        clock.advance(jiff::SignedDuration::from_secs(10));
        let outcome = coordinator
            .submit(
                FixInput::new(delivery("d-1"), agent("agent-1"), GeoPoint::new(-87.5, -180.0))
                    .with_speed(30.0),
            )
            .await
            .unwrap();

        let eta = outcome.eta.unwrap();
        assert!(eta.remaining.is_finite());
        assert!(eta.progress_pct.is_finite());
        assert!(eta.estimated_arrival > timestamp(10));
        assert_eq!(
            coordinator.active_route(&delivery("d-1")).unwrap().estimated_arrival(),
            eta.estimated_arrival
        );
    }

    #[tokio::test]
    async fn status_tracking_resets_when_route_ends() {
        let clock = Arc::new(ManualClock::new(timestamp(0)));
        let coordinator = coordinator(clock);
        let mut subscription = coordinator
            .subscribe(&delivery("d-1"), &SubscriberId::new("admin").unwrap())
            .unwrap();

        coordinator
            .create_route(&delivery("d-1"), &agent("agent-1"), plan(5000.0, 900))
            .await
            .unwrap();
        coordinator.start_route(&delivery("d-1")).await.unwrap();
        coordinator
            .submit(input("d-1", "agent-1").with_status(FixStatus::Delivering))
            .await
            .unwrap();
        coordinator.cancel_route(&delivery("d-1")).await.unwrap();
        coordinator
            .submit(input("d-1", "agent-1").with_status(FixStatus::Delivering))
            .await
            .unwrap();

        let mut previous_statuses = Vec::new();
        while let Ok(Some(event)) =
            timeout(Duration::from_millis(100), subscription.recv()).await
        {
            if let TrackingEvent::StatusChanged { previous, .. } = event.as_ref() {
                previous_statuses.push(*previous);
            }
        }

        assert_eq!(previous_statuses, vec![None, None]);
    }
}
