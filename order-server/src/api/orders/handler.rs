//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{ApiResponse, CreateOrder, Order, UpdateOrderStatus};

use crate::api::convert::transition_error;
use crate::core::ServerState;
use crate::orders::{FindAllPage, RepoError};
use crate::store::ScanCursor;
use crate::utils::{AppError, AppResult};

/// Orders per listing page
const LIST_PAGE_SIZE: u32 = 50;
/// Fresh ids tried before giving up on a create
const CREATE_ATTEMPTS: usize = 3;
/// Read-modify-write rounds before a contended status update gives up
const UPDATE_ATTEMPTS: usize = 5;

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Token from a previous page's `next`; absent for the first page
    #[serde(default)]
    pub cursor: Option<String>,
}

/// One page of orders
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderPage {
    pub items: Vec<Order>,
    /// Absent once the listing is complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Malformed bodies are client errors regardless of which JSON check failed
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::invalid_request(rejection.body_text()))
}

fn parse_id(raw: &str) -> AppResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| AppError::invalid_request(format!("Invalid order id: {}", raw)))
}

/// Create an order under a random id
pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<CreateOrder>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let payload = body(payload)?;
    let deadline = state.request_deadline();
    let created_at = Utc::now();

    let mut last_err = None;
    for attempt in 1..=CREATE_ATTEMPTS {
        let order = Order::new(
            rand::random::<u64>(),
            payload.customer_id,
            payload.line_items.clone(),
            created_at,
        );

        match state.orders.insert(&order, deadline.token()).await {
            Ok(()) => {
                tracing::info!(
                    order_id = order.order_id,
                    customer_id = %order.customer_id,
                    "Order created"
                );
                return Ok((StatusCode::CREATED, Json(order)));
            }
            Err(RepoError::AlreadyExists(id)) => {
                tracing::warn!(order_id = id, attempt, "Order id collision, retrying");
                last_err = Some(RepoError::AlreadyExists(id));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(last_err
        .map(AppError::from)
        .unwrap_or_else(|| AppError::internal("Order creation exhausted its attempts")))
}

/// List orders one page at a time
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<OrderPage>> {
    let offset = match query.cursor.as_deref() {
        None | Some("") => ScanCursor::START,
        Some(raw) => raw
            .parse::<ScanCursor>()
            .map_err(|_| AppError::invalid_request(format!("Invalid cursor: {}", raw)))?,
    };

    let deadline = state.request_deadline();
    let page = FindAllPage::new(offset, LIST_PAGE_SIZE);
    let result = state.orders.find_all(&page, deadline.token()).await?;

    let next = (!result.cursor.is_start()).then(|| result.cursor.to_string());
    Ok(Json(OrderPage {
        items: result.orders,
        next,
    }))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let id = parse_id(&id)?;
    let deadline = state.request_deadline();
    let order = state.orders.find_by_id(id, deadline.token()).await?;
    Ok(Json(order))
}

/// Advance an order to shipped or completed
pub async fn update_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrderStatus>, JsonRejection>,
) -> AppResult<Json<Order>> {
    let id = parse_id(&id)?;
    let payload = body(payload)?;
    let deadline = state.request_deadline();

    let mut attempt = 1;
    loop {
        let current = state.orders.find_by_id(id, deadline.token()).await?;
        let mut order = current.clone();
        order
            .transition(payload.status, Utc::now())
            .map_err(transition_error)?;

        match state
            .orders
            .update_if(&current, &order, deadline.token())
            .await
        {
            Ok(()) => {
                tracing::info!(order_id = id, status = ?payload.status, "Order status updated");
                return Ok(Json(order));
            }
            // Re-read: the concurrent writer may already have made this change
            Err(RepoError::Conflict(_)) if attempt < UPDATE_ATTEMPTS => {
                tracing::debug!(order_id = id, attempt, "Order changed under update, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Delete order by id
pub async fn delete_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    let id = parse_id(&id)?;
    let deadline = state.request_deadline();
    state.orders.delete_by_id(id, deadline.token()).await?;

    tracing::info!(order_id = id, "Order deleted");
    Ok(ApiResponse::ok())
}
