use anyhow::Result;
use migration_core::{init_tracing_from_config, load_config};
use migration_worker::{MigrationWorkerConfig, MigrationWorkerServer};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("MIGRATION_CONFIG").ok();
    let app_config = load_config(config_path.as_deref());

    // 日志级别与格式来自配置，RUST_LOG 优先
    init_tracing_from_config(Some(&app_config.logging));

    let worker_config = MigrationWorkerConfig::from_app_config(app_config)?;
    let server = MigrationWorkerServer::new(worker_config, None, None).await?;

    info!("Starting Migration Worker");

    // 单次调用中的错误只记录日志，不影响退出码
    server.run().await
}
