use anyhow::Context;
use order_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    setup_environment();

    tracing::info!("Order server starting...");

    // 2. 加载配置
    let config = Config::from_env();

    // 3. 打开存储并初始化服务器状态
    let db_path = config.db_path();
    let state = ServerState::initialize(&config)
        .await
        .with_context(|| format!("Failed to open order store at {}", db_path.display()))?;

    // 4. 启动 HTTP 服务器，关闭后释放存储
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    tracing::info!("Order server stopped");
    Ok(())
}
