//! Seed Orders Example - 向订单库写入随机订单
//!
//! 通过 Tower oneshot 在同进程内调用 `POST /orders`，零网络开销。
//! 使用与服务器相同的配置 (WORK_DIR / DB_FILE)，运行前需先停止服务器
//! (数据库文件同一时间只能被一个进程打开)。
//!
//! 运行: cargo run -p order-server --example seed_orders [-- <count>]

use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use order_server::{Config, ServerState, api, setup_environment};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

const DEFAULT_COUNT: usize = 120;
const ITEM_POOL: usize = 1000;
const CUSTOMER_POOL: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_environment();

    let count = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => DEFAULT_COUNT,
    };

    let config = Config::from_env();
    let state = ServerState::initialize(&config).await?;
    let router = api::router(state.clone());

    let item_ids: Vec<Uuid> = (0..ITEM_POOL).map(|_| Uuid::new_v4()).collect();
    let customers: Vec<Uuid> = (0..CUSTOMER_POOL).map(|_| Uuid::new_v4()).collect();

    for i in 1..=count {
        let order = random_order(&customers, &item_ids);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/orders")
            .header("content-type", "application/json")
            .body(Body::from(order.to_string()))?;
        let response = router.clone().oneshot(request).await?;

        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        if status != StatusCode::CREATED {
            anyhow::bail!(
                "order {} rejected with {}: {}",
                i,
                status,
                String::from_utf8_lossy(&bytes)
            );
        }

        let created: Value = serde_json::from_slice(&bytes)?;
        println!("posted order {} (id {})", i, created["order_id"]);
    }

    state.store.close().await?;
    println!("seeded {} orders into {}", count, config.db_path().display());
    Ok(())
}

fn random_order(customers: &[Uuid], item_ids: &[Uuid]) -> Value {
    let mut rng = rand::thread_rng();
    let line_items: Vec<Value> = (0..rng.gen_range(1..=10))
        .map(|_| {
            json!({
                "item_id": item_ids.choose(&mut rng),
                "quantity": rng.gen_range(1..=10),
                "price": rng.gen_range(1..=10_000),
            })
        })
        .collect();

    json!({
        "customer_id": customers.choose(&mut rng),
        "line_items": line_items,
    })
}
