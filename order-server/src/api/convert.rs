//! 错误转换模块
//!
//! 将仓库层和领域层错误转换为 API 错误 ([`AppError`])

use shared::models::order::StatusTransitionError;
use shared::{AppError, ErrorCode};

use crate::orders::RepoError;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotExist(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order {} not found", id))
                    .with_detail("order_id", id)
            }
            RepoError::AlreadyExists(id) => AppError::with_message(
                ErrorCode::OrderAlreadyExists,
                format!("Order {} already exists", id),
            )
            .with_detail("order_id", id),
            // Logged once, by the System-category branch of `IntoResponse`
            RepoError::Decode { key, source } => AppError::new(ErrorCode::StorageCorrupted)
                .with_detail("key", key)
                .with_detail("reason", source.to_string()),
            RepoError::Conflict(id) => AppError::with_message(
                ErrorCode::OrderConflict,
                format!("Order {} was modified concurrently", id),
            )
            .with_detail("order_id", id),
            RepoError::Encode(e) => AppError::internal(e.to_string()),
            RepoError::Store(e) => AppError::database(e.to_string()),
            RepoError::Cancelled => AppError::timeout("Request cancelled before completion"),
        }
    }
}

/// Map a rejected status change onto its error code
pub fn transition_error(err: StatusTransitionError) -> AppError {
    let code = match err {
        StatusTransitionError::AlreadyShipped(_) => ErrorCode::OrderAlreadyShipped,
        StatusTransitionError::AlreadyCompleted(_) => ErrorCode::OrderAlreadyCompleted,
        StatusTransitionError::NotShipped(_) => ErrorCode::OrderNotShipped,
        StatusTransitionError::Unsupported(_) => ErrorCode::OrderInvalidStatus,
    };
    AppError::with_message(code, err.to_string())
}
