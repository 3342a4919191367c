// 配置管理相关命令

use super::AppState;
use crate::core::update_log_level;
use crate::models::{AppConfig, AppConfigPatch};

pub fn get_config(state: &AppState) -> Result<AppConfig, String> {
    Ok(state.config.get_config())
}

/// 合并并保存配置，自动备份开关与日志级别立即生效
pub fn set_config(state: &AppState, patch: AppConfigPatch) -> Result<AppConfig, String> {
    let update = state.config.set_config(patch).map_err(|e| e.to_string())?;

    state.engine.apply_config(&update.config);
    if update.log_level_changed {
        if let Err(e) = update_log_level(update.config.log.level) {
            tracing::warn!(error = ?e, "日志级别热更新失败");
        }
    }

    Ok(update.config)
}
