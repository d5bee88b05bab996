//! Data models
//!
//! Wire and storage representation of orders. The same JSON shape is
//! returned by the HTTP API and written to the key-value store.

pub mod order;

pub use order::{
    CreateOrder, LineItem, Order, OrderStatus, StatusTransitionError, UpdateOrderStatus,
};
