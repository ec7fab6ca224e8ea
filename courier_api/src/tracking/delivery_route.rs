use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use courier_tracking::{
    features::route_feature,
    geopoint::GeoPoint,
    ids::{AgentId, DeliveryId},
    ingest_coordinator::RouteCompletion,
    meters::Meters,
    route::{Route, RouteEndpoint, RoutePlan},
};
use geojson::Feature;
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;

use crate::{error::ApiError, pagination::PaginatedResponse, state::AppState};

#[derive(Deserialize)]
pub struct CreateRouteBody {
    pub agent_id: AgentId,
    pub origin: RouteEndpoint,
    pub destination: RouteEndpoint,
    #[serde(default)]
    pub waypoints: Vec<GeoPoint>,
    pub encoded_path: Option<String>,
    pub distance_meters: f64,
    pub duration_seconds: i64,
}

impl CreateRouteBody {
    fn into_plan(self) -> (AgentId, RoutePlan) {
        (
            self.agent_id,
            RoutePlan {
                origin: self.origin,
                destination: self.destination,
                waypoints: self.waypoints,
                encoded_path: self.encoded_path,
                distance: Meters::new(self.distance_meters),
                duration: SignedDuration::from_secs(self.duration_seconds),
            },
        )
    }
}

pub async fn create_route_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
    Json(body): Json<CreateRouteBody>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    let (agent_id, plan) = body.into_plan();
    let route = state
        .coordinator
        .create_route(&delivery_id, &agent_id, plan)
        .await?;

    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn start_route_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
) -> Result<Json<Route>, ApiError> {
    Ok(Json(state.coordinator.start_route(&delivery_id).await?))
}

#[derive(Deserialize)]
pub struct CompleteRouteBody {
    pub actual_arrival: Option<Timestamp>,
}

pub async fn complete_route_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
    body: Option<Json<CompleteRouteBody>>,
) -> Result<Json<RouteCompletion>, ApiError> {
    let actual_arrival = body.and_then(|Json(body)| body.actual_arrival);
    let completion = state
        .coordinator
        .complete_route(&delivery_id, actual_arrival)
        .await?;

    Ok(Json(completion))
}

pub async fn cancel_route_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
) -> Result<Json<Route>, ApiError> {
    Ok(Json(state.coordinator.cancel_route(&delivery_id).await?))
}

pub async fn route_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
) -> Result<Json<Route>, ApiError> {
    Ok(Json(state.coordinator.route(&delivery_id)?))
}

pub async fn route_feature_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
) -> Result<Json<Feature>, ApiError> {
    let route = state.coordinator.route(&delivery_id)?;
    let progress = state
        .coordinator
        .progress(&delivery_id)
        .map(|update| update.progress_pct);

    Ok(Json(route_feature(&route, progress)))
}

pub async fn active_routes_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PaginatedResponse<Route>>, ApiError> {
    let routes = state.coordinator.active_routes();

    Ok(Json(PaginatedResponse {
        page: 1,
        per_page: routes.len(),
        total: routes.len(),
        total_pages: 1,
        data: routes,
    }))
}
