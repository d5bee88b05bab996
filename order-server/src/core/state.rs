use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{Config, Result};
use crate::orders::OrderRepository;
use crate::store::{KvStore, RedbStore};
use crate::utils::RequestDeadline;

/// 服务器状态 - 所有请求共享
///
/// 克隆成本低：内部均为 `Arc` 或句柄。
///
/// # 示例
///
/// ```ignore
/// let state = ServerState::initialize(&config).await?;
/// let deadline = state.request_deadline();
/// let order = state.orders.find_by_id(7, deadline.token()).await?;
/// ```
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 键值存储后端
    pub store: Arc<dyn KvStore>,
    /// 订单仓库
    pub orders: OrderRepository,
    /// 关闭信号，所有请求 token 的父节点
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// 使用已有存储构造 (测试和嵌入场景)
    pub fn with_store(config: Config, store: Arc<dyn KvStore>) -> Self {
        Self {
            orders: OrderRepository::new(store.clone()),
            config,
            store,
            shutdown: CancellationToken::new(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序：
    /// 1. 确保工作目录存在
    /// 2. 打开数据库 (work_dir/db_file)
    /// 3. 连通性检查
    pub async fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let db_path = config.db_path();
        let store = RedbStore::open(&db_path)?;
        store.ping().await?;

        Ok(Self::with_store(config.clone(), Arc::new(store)))
    }

    /// 为单个请求派生取消范围
    pub fn request_deadline(&self) -> RequestDeadline {
        RequestDeadline::new(&self.shutdown, self.config.request_timeout())
    }
}
