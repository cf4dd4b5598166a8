use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::files::FileError;

impl IntoResponse for FileError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            FileError::Validation(msg) => (StatusCode::BAD_REQUEST, format!("Bad request: {}", msg)),
            FileError::TooLarge { limit, .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File too large, limit is {} bytes", limit),
            ),
            FileError::NotFound => (StatusCode::NOT_FOUND, "File not found".to_string()),
            FileError::Gone => (StatusCode::GONE, "File gone".to_string()),
            FileError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            FileError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unexpected error".to_string(),
                )
            }
        };

        (status, msg).into_response()
    }
}
