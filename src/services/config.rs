//! 应用配置存储
//!
//! 配置以 JSON 保存在 `~/.actm/config.json`，缺失字段在加载时按默认值补齐。

use crate::core::error::{EngineError, EngineResult};
use crate::models::{AppConfig, AppConfigPatch};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// 配置目录 (~/.actm)
pub fn app_dir() -> EngineResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or(EngineError::HomeDirUnavailable)?;
    Ok(home_dir.join(".actm"))
}

/// set-config 的结果
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub config: AppConfig,
    pub log_level_changed: bool,
}

pub struct ConfigManager {
    path: PathBuf,
    current: RwLock<AppConfig>,
    load_warning: Option<String>,
}

impl ConfigManager {
    /// 加载默认位置的配置
    pub fn new() -> EngineResult<Self> {
        Ok(Self::with_path(app_dir()?.join("config.json")))
    }

    /// 加载指定文件
    ///
    /// 文件不存在时使用默认配置；文件损坏或无法读取时同样回退到默认配置，
    /// 原因保存在 `load_warning` 中，下一次 `set_config` 会覆盖损坏的文件。
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (config, load_warning) = match read_config(&path) {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "配置文件无法读取，使用默认配置");
                (AppConfig::default(), Some(e.to_string()))
            }
        };
        ConfigManager {
            path,
            current: RwLock::new(config),
            load_warning,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 加载时回退到默认配置的原因
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn get_config(&self) -> AppConfig {
        match self.current.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 合并部分配置并写入磁盘
    pub fn set_config(&self, patch: AppConfigPatch) -> EngineResult<ConfigUpdate> {
        let mut merged = self.get_config();
        let log_level_changed = merged.apply(patch);
        write_config(&self.path, &merged)?;
        self.replace(merged.clone());

        tracing::info!(path = %self.path.display(), "配置已保存");
        Ok(ConfigUpdate {
            config: merged,
            log_level_changed,
        })
    }

    fn replace(&self, config: AppConfig) {
        match self.current.write() {
            Ok(mut current) => *current = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
    }
}

fn read_config(path: &Path) -> EngineResult<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let config = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// 写入配置文件并限制为仅当前用户可读写
fn write_config(path: &Path, config: &AppConfig) -> EngineResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(|e| EngineError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| EngineError::io(path, e))?
            .permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| EngineError::io(path, e))?;
    }

    Ok(())
}
