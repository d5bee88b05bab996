//! 工具模块
//!
//! - [`logger`] - tracing 初始化
//! - [`deadline`] - 请求级取消 ([`RequestDeadline`])

pub mod deadline;
pub mod logger;

pub use deadline::RequestDeadline;
pub use shared::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
