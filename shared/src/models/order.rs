//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Order lifecycle stage, derived from which timestamps are set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Shipped,
    Completed,
}

/// A single product line within an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LineItem {
    pub item_id: Uuid,
    pub quantity: u64,
    /// Price in the smallest currency unit
    pub price: u64,
}

/// Purchase order
///
/// Timestamps are always serialized, with `null` standing for "not yet".
/// Decoding requires all three keys to be present so that a truncated or
/// hand-edited document is rejected instead of read back as unshipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItem>,
    #[serde(deserialize_with = "nullable")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Present-but-possibly-null field. Unlike the derived `Option` handling,
/// a missing key is an error.
fn nullable<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DateTime<Utc>>::deserialize(deserializer)
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusTransitionError {
    #[error("Order {0} has already been shipped")]
    AlreadyShipped(u64),

    #[error("Order {0} has already been completed")]
    AlreadyCompleted(u64),

    #[error("Order {0} has not been shipped yet")]
    NotShipped(u64),

    #[error("Order status cannot be set back to {0:?}")]
    Unsupported(OrderStatus),
}

impl Order {
    pub fn new(
        order_id: u64,
        customer_id: Uuid,
        line_items: Vec<LineItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            customer_id,
            line_items,
            created_at: Some(created_at),
            shipped_at: None,
            completed_at: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        if self.completed_at.is_some() {
            OrderStatus::Completed
        } else if self.shipped_at.is_some() {
            OrderStatus::Shipped
        } else {
            OrderStatus::Created
        }
    }

    /// Mark the order shipped. Each timestamp is set at most once.
    pub fn ship(&mut self, at: DateTime<Utc>) -> Result<(), StatusTransitionError> {
        if self.shipped_at.is_some() {
            return Err(StatusTransitionError::AlreadyShipped(self.order_id));
        }
        self.shipped_at = Some(at);
        Ok(())
    }

    /// Mark the order completed. Requires a prior shipment.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), StatusTransitionError> {
        if self.completed_at.is_some() {
            return Err(StatusTransitionError::AlreadyCompleted(self.order_id));
        }
        if self.shipped_at.is_none() {
            return Err(StatusTransitionError::NotShipped(self.order_id));
        }
        self.completed_at = Some(at);
        Ok(())
    }

    /// Apply a requested status change
    pub fn transition(
        &mut self,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<(), StatusTransitionError> {
        match status {
            OrderStatus::Shipped => self.ship(at),
            OrderStatus::Completed => self.complete(at),
            OrderStatus::Created => Err(StatusTransitionError::Unsupported(status)),
        }
    }
}

/// POST /orders request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub customer_id: Uuid,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// PUT /orders/{id} request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: OrderStatus,
}
