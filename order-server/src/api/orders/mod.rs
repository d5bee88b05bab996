//! Order API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /orders | POST | 创建订单 |
//! | /orders | GET | 分页列出订单 (`?cursor=`) |
//! | /orders/{id} | GET | 查询订单 |
//! | /orders/{id} | PUT | 更新订单状态 (shipped / completed) |
//! | /orders/{id} | DELETE | 删除订单 |

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub use handler::{ListQuery, OrderPage};

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/orders", get(handler::list).post(handler::create))
        .route(
            "/orders/{id}",
            get(handler::get_by_id)
                .put(handler::update_by_id)
                .delete(handler::delete_by_id),
        )
}
