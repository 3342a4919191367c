// Tool Detector - 工具检测
//
// 定位命令 → 探测版本 → 推断安装方式 → 查找配置文件
// 预期内的缺失（命令不存在、版本无法提取）降级为 not-installed，
// 其它任何错误都使整条记录变为 error，不返回部分填充的结果

use super::catalog::Catalog;
use super::package_manager;
use crate::core::error::{EngineError, EngineResult};
use crate::models::{InstallMethod, ToolDefinition, ToolInfo, ToolStatus};
use crate::utils::command::{CommandRunner, PROBE_TIMEOUT};
use chrono::Utc;
use futures_util::future::join_all;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const NPM_MARKERS: &[&str] = &["node_modules", ".npm", ".nvm"];
const PIP_MARKERS: &[&str] = &["python", "site-packages", "pipx"];
const BREW_MARKERS: &[&str] = &["/usr/local/Cellar", "homebrew", "linuxbrew"];
const SYSTEM_BIN_DIRS: &[&str] = &["/usr/local/bin", "/usr/bin"];

/// 交叉校验时依次询问的包管理器
const LISTED_PROVIDERS: [InstallMethod; 3] =
    [InstallMethod::Npm, InstallMethod::Pip, InstallMethod::Brew];

pub struct ToolDetector {
    catalog: Arc<Catalog>,
    runner: Arc<dyn CommandRunner>,
    home_dir: Option<PathBuf>,
}

impl ToolDetector {
    pub fn new(catalog: Arc<Catalog>, runner: Arc<dyn CommandRunner>) -> Self {
        ToolDetector {
            catalog,
            runner,
            home_dir: dirs::home_dir(),
        }
    }

    /// 指定 `~` 展开使用的主目录
    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    /// 并发检测目录中的所有工具，结果顺序与目录顺序一致
    pub async fn scan_all_tools(&self) -> Vec<ToolInfo> {
        let definitions = self.catalog.definitions();
        tracing::info!(tool_count = definitions.len(), "开始扫描工具");

        let results = join_all(definitions.iter().map(|def| self.detect_tool(def))).await;

        let installed = results
            .iter()
            .filter(|info| info.status == ToolStatus::Installed)
            .count();
        tracing::info!(installed, total = results.len(), "工具扫描完成");
        results
    }

    /// 检测单个工具，总是返回一条 ToolInfo
    pub async fn detect_tool(&self, definition: &ToolDefinition) -> ToolInfo {
        match self.try_detect(definition).await {
            Ok(info) => info,
            Err(e) if e.is_expected_absence() => {
                tracing::debug!(tool = %definition.name, reason = %e, "工具未安装");
                ToolInfo::not_installed(definition)
            }
            Err(e) => {
                tracing::warn!(tool = %definition.name, error = ?e, "工具检测失败");
                ToolInfo::failed(definition, e.to_string())
            }
        }
    }

    async fn try_detect(&self, definition: &ToolDefinition) -> EngineResult<ToolInfo> {
        let pattern = Regex::new(&definition.version_pattern)?;

        let command_path = self
            .runner
            .locate(&definition.command)
            .ok_or_else(|| EngineError::NotFound(definition.command.clone()))?;

        let current_version = self.probe_version(definition, &pattern).await?;
        let install_method = self.detect_install_method(definition, &command_path).await;
        let config_path = self.find_config_path(definition)?;

        tracing::debug!(
            tool = %definition.name,
            version = %current_version,
            path = %command_path.display(),
            method = %install_method,
            "检测到已安装工具"
        );

        Ok(ToolInfo {
            name: definition.name.clone(),
            display_name: definition.display_name.clone(),
            current_version: Some(current_version),
            latest_version: None,
            install_path: Some(command_path.to_string_lossy().into_owned()),
            install_method,
            config_path: config_path.map(|p| p.to_string_lossy().into_owned()),
            last_checked: Utc::now(),
            status: ToolStatus::Installed,
            is_outdated: false,
            error: None,
        })
    }

    /// 执行版本命令，在 stdout + stderr 中匹配版本号
    async fn probe_version(&self, definition: &ToolDefinition, pattern: &Regex) -> EngineResult<String> {
        let command = definition.probe_command();
        let result = self.runner.run(&command, PROBE_TIMEOUT).await;

        if result.timed_out {
            return Err(EngineError::ProbeFailure(format!("{command} 超时")));
        }
        if !result.success {
            return Err(EngineError::ProbeFailure(format!(
                "{command} 执行失败: {}",
                result.stderr
            )));
        }

        pattern
            .captures(&result.combined_output())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| EngineError::ProbeFailure(format!("{command} 输出中没有版本号")))
    }

    /// 根据安装路径推断安装方式
    async fn detect_install_method(&self, definition: &ToolDefinition, path: &Path) -> InstallMethod {
        if definition.install_methods.vscode.is_some() {
            return InstallMethod::VscodeExtension;
        }

        let path = path.to_string_lossy().replace('\\', "/");
        if let Some(method) = method_from_markers(&path) {
            return method;
        }

        if !SYSTEM_BIN_DIRS.iter().any(|dir| path.contains(dir)) {
            return InstallMethod::Unknown;
        }

        // 系统目录下的命令可能是包管理器创建的链接，逐个询问声明过的包管理器
        for method in LISTED_PROVIDERS {
            let Some(package) = definition.install_methods.package_for(method) else {
                continue;
            };
            if package_manager::is_listed(self.runner.as_ref(), method, package).await {
                return method;
            }
        }
        InstallMethod::Binary
    }

    /// 按声明顺序查找第一个存在的配置文件
    fn find_config_path(&self, definition: &ToolDefinition) -> EngineResult<Option<PathBuf>> {
        for candidate in &definition.config_paths {
            let path = self.expand_home(candidate)?;
            if path.exists() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn expand_home(&self, raw: &str) -> EngineResult<PathBuf> {
        match raw.strip_prefix('~') {
            Some(rest) => {
                let home = self.home_dir.as_ref().ok_or(EngineError::HomeDirUnavailable)?;
                Ok(home.join(rest.trim_start_matches(['/', '\\'])))
            }
            None => Ok(PathBuf::from(raw)),
        }
    }
}

fn method_from_markers(path: &str) -> Option<InstallMethod> {
    let has_any = |markers: &[&str]| markers.iter().any(|m| path.contains(m));
    if has_any(NPM_MARKERS) {
        Some(InstallMethod::Npm)
    } else if has_any(PIP_MARKERS) {
        Some(InstallMethod::Pip)
    } else if has_any(BREW_MARKERS) {
        Some(InstallMethod::Brew)
    } else {
        None
    }
}
