//! Request-level error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::models::clearance::Clearance;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Resource clearance level ({resource}) insufficient for project ({project})")]
    ClearanceViolation {
        resource: Clearance,
        project: Clearance,
    },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    pub fn not_found(label: &str) -> Self {
        TrackerError::NotFound(format!("{label} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Conflict(_) => StatusCode::CONFLICT,
            TrackerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            TrackerError::Forbidden(_) | TrackerError::ClearanceViolation { .. } => {
                StatusCode::FORBIDDEN
            }
            TrackerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TrackerError::Store(StoreError::Duplicate { .. })
            | TrackerError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
            TrackerError::Store(_) | TrackerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(TrackerError::not_found("Risk").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            TrackerError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            TrackerError::Unauthorized("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            TrackerError::ClearanceViolation {
                resource: Clearance::Confidential,
                project: Clearance::Secret,
            }
            .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            TrackerError::Validation("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            TrackerError::Store(StoreError::NotAnObject).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn clearance_violation_names_both_tiers() {
        let err = TrackerError::ClearanceViolation {
            resource: Clearance::Confidential,
            project: Clearance::Secret,
        };
        assert_eq!(
            err.to_string(),
            "Resource clearance level (confidential) insufficient for project (secret)"
        );
    }
}
