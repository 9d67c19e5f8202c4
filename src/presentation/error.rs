// HTTP mapping for the error taxonomy
use crate::domain::error::TelemetryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl TelemetryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRange(_) | Self::InvalidDevice(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::MalformedRecord { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TelemetryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::debug!(status = status.as_u16(), "{}", self);
        } else {
            tracing::error!(status = status.as_u16(), "{}", self);
        }
        (
            status,
            axum::Json(serde_json::json!({
                "error": self.to_string(),
                "retryable": self.is_retryable(),
            })),
        )
            .into_response()
    }
}
