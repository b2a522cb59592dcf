//! HTTP error responses.
//!
//! Every failure leaves the server as an [`Envelope`] with `data: null` and
//! the error text as `message`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskboard::BoardError;
use taskboard_proto::envelope::Envelope;

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A core operation failed.
    #[error(transparent)]
    Board(#[from] BoardError),
    /// The request body is not valid JSON for the endpoint.
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
    /// The request body exceeds the configured limit.
    #[error("Request body too large")]
    PayloadTooLarge,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::MalformedBody(rejection.body_text())
        }
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Board(BoardError::Validation(_) | BoardError::DuplicateEmail)
            | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Board(BoardError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Board(BoardError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Board(BoardError::Store(_)) => "Server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "request rejected");
        }
        (status, Json(Envelope::<()>::error(self.message()))).into_response()
    }
}
