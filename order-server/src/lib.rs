//! Order Server - 订单持久化服务
//!
//! # 架构概述
//!
//! - **存储** (`store`): 键值存储抽象 [`KvStore`] 与嵌入式 redb 后端
//! - **订单** (`orders`): 订单仓库，保证记录与索引集合一致
//! - **HTTP API** (`api`): RESTful 订单接口
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── store/         # KvStore、事务、游标、redb 后端
//! ├── orders/        # 键编码、序列化、仓库
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、请求取消
//! ```

pub mod api;
pub mod core;
pub mod orders;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerError, ServerState};
pub use orders::{FindAllPage, FindResult, OrderRepository, RepoError};
pub use store::{KvStore, RedbStore, ScanCursor, StoreError};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

/// 设置运行环境
///
/// 加载 `.env` (若存在) 并按 `LOG_LEVEL` / `LOG_DIR` 初始化日志
pub fn setup_environment() {
    if let Err(e) = dotenv::dotenv()
        && !e.not_found()
    {
        eprintln!("Failed to load .env: {}", e);
    }

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty());
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}
