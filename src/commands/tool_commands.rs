// 工具生命周期相关命令

use super::AppState;
use crate::models::{BatchUpdateResult, InstallMethod, ToolDefinition, ToolInfo, UpdateResult};

/// 扫描目录中的全部工具
pub async fn scan_tools(state: &AppState) -> Result<Vec<ToolInfo>, String> {
    Ok(state.engine.scan_tools().await)
}

/// 刷新最新版本与过期状态
pub async fn check_versions(state: &AppState, tools: Vec<ToolInfo>) -> Result<Vec<ToolInfo>, String> {
    Ok(state.engine.check_versions(tools).await)
}

pub async fn update_tool(state: &AppState, tool: ToolInfo) -> Result<UpdateResult, String> {
    Ok(state.engine.update_tool(&tool).await)
}

pub async fn batch_update(state: &AppState, tools: Vec<ToolInfo>) -> Result<BatchUpdateResult, String> {
    Ok(state.engine.batch_update(&tools).await)
}

pub async fn install_tool(
    state: &AppState,
    tool_name: String,
    install_method: InstallMethod,
    package_name: String,
) -> Result<UpdateResult, String> {
    Ok(state
        .engine
        .install_tool(&tool_name, install_method, &package_name)
        .await)
}

pub fn get_tool_definitions(state: &AppState) -> Result<Vec<ToolDefinition>, String> {
    Ok(state.engine.tool_definitions())
}

pub fn clear_cache(state: &AppState) -> Result<(), String> {
    state.engine.clear_cache();
    Ok(())
}
