// lib.rs - AI 编程工具生命周期引擎

pub mod commands; // 请求/响应契约与传输
pub mod core; // 核心基础设施层
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;

pub use commands::{AppState, Request, Response};
pub use core::{init_logger, update_log_level, EngineError, EngineResult};
pub use services::tool::{Catalog, ToolDetector, ToolManager, Updater, VersionService};
pub use services::{ConfigManager, ConfigUpdate};
pub use utils::command::{CommandExecutor, CommandResult, CommandRunner};
pub use utils::version::{is_newer, is_outdated};
