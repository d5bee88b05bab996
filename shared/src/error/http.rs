//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::OrderNotFound => StatusCode::NOT_FOUND,

            // 503 Service Unavailable (transient, client can retry)
            Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::StorageCorrupted => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (validation, duplicates and rejected transitions)
            Self::InvalidRequest
            | Self::OrderAlreadyExists
            | Self::OrderAlreadyShipped
            | Self::OrderAlreadyCompleted
            | Self::OrderNotShipped
            | Self::OrderInvalidStatus
            | Self::OrderConflict => StatusCode::BAD_REQUEST,
        }
    }
}
