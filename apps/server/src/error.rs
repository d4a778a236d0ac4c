//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use deepcut_shared::DeepCutError;

/// Error body: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    Core(DeepCutError),
}

impl From<DeepCutError> for ApiError {
    fn from(err: DeepCutError) -> Self {
        Self::Core(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Core(DeepCutError::Validation { .. }) => StatusCode::BAD_REQUEST,
            Self::Core(DeepCutError::Auth { .. }) => StatusCode::UNAUTHORIZED,
            Self::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::NotFound(what) => (*what).to_string(),
            Self::Core(err) => {
                if status.is_server_error() {
                    error!(error = %err, "request failed");
                }
                err.message()
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
