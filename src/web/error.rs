use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::error::SlotError;

impl SlotError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SlotError::NotFound { .. } | SlotError::SlotNotFound { .. } => StatusCode::NOT_FOUND,
            SlotError::SeatOccupied { .. }
            | SlotError::SlotClosed { .. }
            | SlotError::VersionConflict { .. } => StatusCode::CONFLICT,
            SlotError::NotAParticipant { .. } | SlotError::PermissionDenied { .. } => {
                StatusCode::FORBIDDEN
            }
            SlotError::SelfMatchNotAllowed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SlotError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            SlotError::Unidentified => StatusCode::UNAUTHORIZED,
            SlotError::WriteConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
            SlotError::StateLoad { .. }
            | SlotError::StateParse { .. }
            | SlotError::ConfigValidation { .. }
            | SlotError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SlotError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
