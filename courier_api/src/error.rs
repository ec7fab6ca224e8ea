use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use courier_tracking::error::TrackingError;
use serde::Serialize;

pub enum ApiError {
    Tracking(TrackingError),
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Tracking(error) => match error {
                TrackingError::InvalidFix { .. } | TrackingError::InvalidInput(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                TrackingError::Conflict(_) | TrackingError::InvalidState(_) => {
                    StatusCode::CONFLICT
                }
                TrackingError::NotFound(_) => StatusCode::NOT_FOUND,
                TrackingError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                TrackingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Tracking(error) => ErrorBody {
                error: error.kind(),
                message: error.to_string(),
            },
            ApiError::BadRequest(message) => ErrorBody {
                error: "bad_request",
                message: message.clone(),
            },
        }
    }
}

impl From<TrackingError> for ApiError {
    fn from(error: TrackingError) -> Self {
        ApiError::Tracking(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, message = %self.body().message, "Request failed");
        }

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_tracking_errors_to_status() {
        let cases = [
            (
                TrackingError::InvalidFix {
                    field: "latitude",
                    reason: String::from("out of range"),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_fix",
            ),
            (
                TrackingError::Conflict(String::from("active route")),
                StatusCode::CONFLICT,
                "conflict",
            ),
            (
                TrackingError::NotFound(String::from("route")),
                StatusCode::NOT_FOUND,
                "not_found",
            ),
            (
                TrackingError::InvalidState(String::from("not active")),
                StatusCode::CONFLICT,
                "invalid_state",
            ),
            (
                TrackingError::Internal(String::from("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];

        for (error, status, kind) in cases {
            let error = ApiError::from(error);
            assert_eq!(error.status(), status);
            assert_eq!(error.body().error, kind);
        }
    }

    #[test]
    fn should_map_bad_requests() {
        let error = ApiError::BadRequest(String::from("`from` must not be after `to`"));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.body().error, "bad_request");
    }
}
