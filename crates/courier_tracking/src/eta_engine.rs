use jiff::Timestamp;
use serde::Serialize;

use crate::{
    geo_math::{distance_meters, distance_to_path},
    kmh::Kmh,
    location_fix::LocationFix,
    meters::Meters,
    route::Route,
};

/// Progress of a delivery along its active route after one fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EtaUpdate {
    pub progress_pct: f64,
    pub estimated_arrival: Timestamp,
    #[serde(rename = "remaining_meters")]
    pub remaining: Meters,
    /// Distance between the fix and the planned path, informational only.
    #[serde(rename = "off_route_meters", skip_serializing_if = "Option::is_none")]
    pub off_route: Option<Meters>,
}

#[derive(Debug, Clone, Copy)]
pub struct EtaEngine {
    min_moving_speed: Kmh,
}

impl Default for EtaEngine {
    fn default() -> Self {
        EtaEngine::new(Kmh::new(0.5))
    }
}

impl EtaEngine {
    pub fn new(min_moving_speed: Kmh) -> Self {
        EtaEngine { min_moving_speed }
    }

    /// Computes progress and arrival estimate without touching the route.
    ///
    /// A fix slower than the minimum moving speed keeps the route's previous
    /// estimate. The estimate is never earlier than `now`.
    pub fn estimate(&self, route: &Route, fix: &LocationFix, now: Timestamp) -> EtaUpdate {
        let position = fix.position();
        let remaining = distance_meters(&position, &route.destination().point);

        let estimated_arrival = match fix.speed() {
            Some(speed) if speed > self.min_moving_speed => (remaining / speed)
                .and_then(|travel| now.checked_add(travel))
                .unwrap_or_else(|_| route.estimated_arrival()),
            _ => route.estimated_arrival(),
        };

        EtaUpdate {
            progress_pct: progress_pct(remaining, route.distance()),
            estimated_arrival: estimated_arrival.max(now),
            remaining,
            off_route: distance_to_path(&position, &route.path())
                .map(|projection| projection.projection.distance),
        }
    }

    /// Same as [`EtaEngine::estimate`], storing the new estimate on the route.
    pub fn recompute(&self, route: &mut Route, fix: &LocationFix, now: Timestamp) -> EtaUpdate {
        let update = self.estimate(route, fix, now);
        route.set_estimated_arrival(update.estimated_arrival);
        update
    }
}

/// Share of the planned distance already covered, judged from the remaining
/// straight-line distance. A zero-length route is complete by definition.
pub fn progress_pct(remaining: Meters, planned: Meters) -> f64 {
    if planned.value() <= 0.0 {
        return 100.0;
    }

    let progress = 100.0 * (1.0 - remaining / planned);
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 100.0)
    }
}
