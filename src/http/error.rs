use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{Error, Result};

/// Body shown to callers for every server-side failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Conflict { .. } => StatusCode::CONFLICT,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Serialization(..)
            | Error::Io(..)
            | Error::Database(..)
            | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if self.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error = %self, "Request failed");
            INTERNAL_ERROR_MESSAGE.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Unwrap a JSON body, reporting unreadable bodies as validation failures
pub fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| Error::validation(rejection.body_text()))
}
