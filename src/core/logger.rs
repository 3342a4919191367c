use crate::models::config::{LogConfig, LogFormat, LogLevel, LogOutput};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// 全局日志级别 reload handle
static LOG_LEVEL_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// 文件输出的后台写线程 guard，进程存活期间不能被 drop
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 初始化日志系统
///
/// 控制台输出固定写到 stderr，stdout 留给请求/响应通道。
/// 日志级别可以通过 `update_log_level` 动态调整；格式、输出目标、文件路径需要重启后生效。
pub fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    let filter = create_env_filter(config.level);
    let (filter_layer, reload_handle) = reload::Layer::new(filter);

    if LOG_LEVEL_HANDLE.set(reload_handle).is_err() {
        anyhow::bail!("日志系统已初始化，不能重复初始化");
    }

    let file_path = config.file_path.as_deref();
    let registry = Registry::default().with(filter_layer);

    let result = match (config.output, config.format) {
        (LogOutput::Console, LogFormat::Text) => {
            registry.with(create_console_text_layer()).try_init()
        }
        (LogOutput::Console, LogFormat::Json) => {
            registry.with(create_console_json_layer()).try_init()
        }
        (LogOutput::File, LogFormat::Text) => registry
            .with(create_file_layer(file_path, false)?)
            .try_init(),
        (LogOutput::File, LogFormat::Json) => registry
            .with(create_file_layer(file_path, true)?)
            .try_init(),
        (LogOutput::Both, LogFormat::Text) => registry
            .with(create_console_text_layer())
            .with(create_file_layer(file_path, false)?)
            .try_init(),
        (LogOutput::Both, LogFormat::Json) => registry
            .with(create_console_json_layer())
            .with(create_file_layer(file_path, true)?)
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("安装日志订阅器失败: {e}"))?;

    tracing::info!(
        level = config.level.as_str(),
        format = ?config.format,
        output = ?config.output,
        file_path = ?config.file_path,
        "日志系统初始化完成"
    );

    Ok(())
}

/// 创建环境过滤器
///
/// `RUST_LOG` 优先，例如 `RUST_LOG=actm=trace,reqwest=debug`
fn create_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "actm={},hyper=warn,reqwest=warn,h2=warn",
            level.as_str()
        ))
    })
}

fn create_console_text_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .with_ansi(false)
        .boxed()
}

fn create_console_json_layer<S>() -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(cfg!(debug_assertions))
        .with_thread_ids(false)
        .boxed()
}

/// 创建按天滚动的文件输出层
fn create_file_layer<S>(
    file_path: Option<&str>,
    json: bool,
) -> anyhow::Result<Box<dyn Layer<S> + Send + Sync + 'static>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    let log_dir = get_log_dir(file_path)?;
    let file_appender = rolling::daily(log_dir, "actm");
    let (writer, guard) = non_blocking(file_appender);

    if FILE_GUARD.set(guard).is_err() {
        anyhow::bail!("文件日志已初始化");
    }

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_ids(json);

    Ok(if json {
        layer.json().with_target(true).boxed()
    } else {
        layer.with_target(cfg!(debug_assertions)).boxed()
    })
}

/// 获取日志目录（默认 ~/.actm/logs）
fn get_log_dir(file_path: Option<&str>) -> anyhow::Result<PathBuf> {
    let dir = match file_path {
        Some(path) => PathBuf::from(path),
        None => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("无法获取用户主目录"))?
            .join(".actm")
            .join("logs"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// 动态更新日志级别（热重载）
pub fn update_log_level(new_level: LogLevel) -> anyhow::Result<()> {
    let handle = LOG_LEVEL_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("日志系统未初始化"))?;

    handle
        .reload(create_env_filter(new_level))
        .map_err(|e| anyhow::anyhow!("重载日志级别失败: {e}"))?;

    tracing::info!(new_level = new_level.as_str(), "日志级别已动态更新");
    Ok(())
}
