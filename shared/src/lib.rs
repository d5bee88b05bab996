//! Shared types for the orders service
//!
//! Domain models exchanged over HTTP and persisted by the order store,
//! plus the unified error and response types used by the API layer.

pub mod error;
pub mod models;

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{CreateOrder, LineItem, Order, OrderStatus, UpdateOrderStatus};
