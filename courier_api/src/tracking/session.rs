use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use courier_tracking::{ids::DeliveryId, tracking_session::SessionSnapshot};

use crate::{error::ApiError, state::AppState};

pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(delivery_id): Path<DeliveryId>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.coordinator.session_snapshot(&delivery_id)?))
}
