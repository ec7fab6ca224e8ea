use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    state::AppState,
    tracking::{
        delivery_route::{
            active_routes_handler, cancel_route_handler, complete_route_handler,
            create_route_handler, route_feature_handler, route_handler, start_route_handler,
        },
        fixes::{
            fix_history_handler, fix_trail_handler, latest_fix_feature_handler,
            latest_fix_handler, submit_fix_handler,
        },
        session::session_handler,
        ws,
    },
};

pub fn tracking_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/deliveries/{delivery_id}/fixes",
            get(fix_history_handler).post(submit_fix_handler),
        )
        .route("/deliveries/{delivery_id}/fixes/latest", get(latest_fix_handler))
        .route("/deliveries/{delivery_id}/fixes/trail", get(fix_trail_handler))
        .route(
            "/deliveries/{delivery_id}/fixes/latest/feature",
            get(latest_fix_feature_handler),
        )
        .route(
            "/deliveries/{delivery_id}/route",
            get(route_handler).post(create_route_handler),
        )
        .route("/deliveries/{delivery_id}/route/start", post(start_route_handler))
        .route(
            "/deliveries/{delivery_id}/route/complete",
            post(complete_route_handler),
        )
        .route("/deliveries/{delivery_id}/route/cancel", post(cancel_route_handler))
        .route(
            "/deliveries/{delivery_id}/route/feature",
            get(route_feature_handler),
        )
        .route("/deliveries/{delivery_id}/session", get(session_handler))
        .route("/deliveries/{delivery_id}/ws", get(ws::handler))
        .route("/routes/active", get(active_routes_handler))
        .with_state(state)
}
