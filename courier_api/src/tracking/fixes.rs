use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use courier_tracking::{
    error::TrackingError,
    ids::{AgentId, DeliveryId},
    ingest_coordinator::SubmitOutcome,
    location_fix::{FixInput, FixStatus, LocationFix},
    location_store::TimeRange,
};
use geojson::Feature;
use jiff::Timestamp;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    error::ApiError,
    pagination::{PaginatedResponse, Pagination},
    state::AppState,
};

/// A fix as sent by the agent device; the delivery comes from the path.
#[derive(Deserialize)]
pub struct SubmitFixBody {
    pub agent_id: AgentId,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub status: Option<FixStatus>,
    pub metadata: Option<Map<String, Value>>,
    pub timestamp: Option<Timestamp>,
}

impl SubmitFixBody {
    fn into_input(self, delivery_id: DeliveryId) -> FixInput {
        FixInput {
            delivery_id,
            agent_id: self.agent_id,
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            speed: self.speed,
            heading: self.heading,
            status: self.status,
            metadata: self.metadata,
            timestamp: self.timestamp,
        }
    }
}

pub async fn submit_fix_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
    Json(body): Json<SubmitFixBody>,
) -> Result<Json<SubmitOutcome>, ApiError> {
    let outcome = state
        .coordinator
        .submit(body.into_input(delivery_id))
        .await?;

    Ok(Json(outcome))
}

pub async fn latest_fix_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
) -> Result<Json<Arc<LocationFix>>, ApiError> {
    Ok(Json(state.coordinator.latest_fix(&delivery_id)?))
}

pub async fn latest_fix_feature_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
) -> Result<Json<Feature>, ApiError> {
    let fix = state.coordinator.latest_fix(&delivery_id)?;
    Ok(Json(courier_tracking::features::fix_feature(&fix)))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl HistoryQuery {
    fn range(&self) -> Result<TimeRange, ApiError> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(ApiError::BadRequest(String::from(
                "`from` must not be after `to`",
            )));
        }

        Ok(TimeRange::new(self.from, self.to))
    }
}

pub async fn fix_history_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
    Query(range): Query<HistoryQuery>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<PaginatedResponse<Arc<LocationFix>>>, ApiError> {
    let page = state.coordinator.fix_history_page(
        &delivery_id,
        range.range()?,
        pagination.offset() as usize,
        pagination.limit() as usize,
    );

    Ok(Json(PaginatedResponse::new(
        page.fixes,
        &pagination,
        page.total,
    )))
}

/// Line through the recorded fixes of a delivery.
pub async fn fix_trail_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
    Query(range): Query<HistoryQuery>,
) -> Result<Json<Feature>, ApiError> {
    let history = state.coordinator.fix_history(&delivery_id, range.range()?);

    courier_tracking::features::trail_feature(&history)
        .map(Json)
        .ok_or_else(|| {
            TrackingError::NotFound(format!("trail for delivery {delivery_id}")).into()
        })
}
