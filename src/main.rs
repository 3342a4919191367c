use actm::commands::{serve, AppState};
use actm::services::{ConfigManager, ToolManager};
use anyhow::Context;
use tokio::io::{self, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_manager = ConfigManager::new().context("无法确定配置目录")?;
    let config = config_manager.get_config();

    // 日志初始化失败不影响请求处理
    if let Err(e) = actm::init_logger(&config.log) {
        eprintln!("日志系统初始化失败: {e}");
    }
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_manager.path().display(),
        "actm 启动"
    );
    if let Some(reason) = config_manager.load_warning() {
        tracing::warn!(
            path = %config_manager.path().display(),
            error = reason,
            "配置文件无法读取，已使用默认配置"
        );
    }

    let engine = ToolManager::from_config(&config).context("初始化工具引擎失败")?;
    engine.initialize().await;

    let state = AppState::new(engine, config_manager);
    serve(&state, BufReader::new(io::stdin()), io::stdout())
        .await
        .context("请求通道异常")?;

    Ok(())
}
