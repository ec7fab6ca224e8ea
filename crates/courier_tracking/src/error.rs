use thiserror::Error;

use crate::ids::{DeliveryId, SubscriberId};

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind} must not be empty")]
pub struct EmptyIdentifier {
    pub kind: &'static str,
}

/// Errors surfaced by every tracking operation.
///
/// Validation and lifecycle errors leave all state untouched; `Internal` is the
/// only variant a caller may retry as-is.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackingError {
    #[error("invalid fix: {field} {reason}")]
    InvalidFix { field: &'static str, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("subscriber {subscriber} may not observe delivery {delivery}")]
    Unauthorized {
        subscriber: SubscriberId,
        delivery: DeliveryId,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl TrackingError {
    pub(crate) fn invalid_fix(field: &'static str, reason: impl Into<String>) -> Self {
        TrackingError::InvalidFix {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TrackingError::InvalidFix { .. } => "invalid_fix",
            TrackingError::InvalidInput(_) => "invalid_input",
            TrackingError::Conflict(_) => "conflict",
            TrackingError::NotFound(_) => "not_found",
            TrackingError::InvalidState(_) => "invalid_state",
            TrackingError::Unauthorized { .. } => "unauthorized",
            TrackingError::Internal(_) => "internal",
        }
    }
}

pub type TrackingResult<T> = Result<T, TrackingError>;
