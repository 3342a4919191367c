// 命令层：请求 / 响应契约与 JSON lines 传输

pub mod config_commands;
pub mod dispatch;
pub mod tool_commands;
pub mod types;

pub use dispatch::{handle, handle_line, serve};
pub use types::{Request, Response};

use crate::services::{ConfigManager, ToolManager};

/// 命令处理所需的共享状态，启动时组装一次
pub struct AppState {
    pub engine: ToolManager,
    pub config: ConfigManager,
}

impl AppState {
    pub fn new(engine: ToolManager, config: ConfigManager) -> Self {
        AppState { engine, config }
    }
}
