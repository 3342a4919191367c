//! 更新器
//!
//! 单个工具的更新按状态机推进：
//! `Validating → BackingUp → Mutating → Verifying → Succeeded`，
//! 变更或校验失败时进入 `RollingBack → RolledBack | RollbackFailed`。
//! 每一步都追加到返回给调用方的执行日志中。

use super::catalog::Catalog;
use super::package_manager;
use crate::core::error::{EngineError, EngineResult};
use crate::models::{
    BackupManifest, BatchUpdateResult, InstallMethod, ToolDefinition, ToolInfo, ToolStatus,
    UpdatePhase, UpdateResult,
};
use crate::utils::command::{CommandRunner, MUTATION_TIMEOUT, PROBE_TIMEOUT};
use crate::utils::version::extract_version;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

const MANIFEST_FILE: &str = "version.json";

/// 安装成功时的版本占位（安装输出不会被重新解析）
pub const INSTALLED_MARKER: &str = "installed";

pub struct Updater {
    catalog: Arc<Catalog>,
    runner: Arc<dyn CommandRunner>,
    backup_dir: PathBuf,
    auto_backup: AtomicBool,
}

/// 一次更新的执行记录
struct UpdateRun {
    tool: String,
    phase: UpdatePhase,
    log: String,
}

impl UpdateRun {
    fn new(tool: &str) -> Self {
        UpdateRun {
            tool: tool.to_string(),
            phase: UpdatePhase::Idle,
            log: String::new(),
        }
    }

    fn enter(&mut self, phase: UpdatePhase) {
        tracing::debug!(tool = %self.tool, from = ?self.phase, to = ?phase, "更新阶段切换");
        self.phase = phase;
    }

    fn note(&mut self, line: impl AsRef<str>) {
        self.log.push_str(line.as_ref());
        self.log.push('\n');
    }
}

impl Updater {
    pub fn new(catalog: Arc<Catalog>, runner: Arc<dyn CommandRunner>) -> EngineResult<Self> {
        let home = dirs::home_dir().ok_or(EngineError::HomeDirUnavailable)?;
        Ok(Self::with_backup_dir(
            catalog,
            runner,
            home.join(".actm").join("backups"),
        ))
    }

    pub fn with_backup_dir(
        catalog: Arc<Catalog>,
        runner: Arc<dyn CommandRunner>,
        backup_dir: PathBuf,
    ) -> Self {
        Updater {
            catalog,
            runner,
            backup_dir,
            auto_backup: AtomicBool::new(true),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn set_auto_backup(&self, enabled: bool) {
        self.auto_backup.store(enabled, Ordering::Relaxed);
    }

    /// 创建备份目录，失败只记录日志
    pub async fn initialize(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.backup_dir).await {
            tracing::error!(
                path = %self.backup_dir.display(),
                error = ?e,
                "创建备份目录失败"
            );
        }
    }

    /// 更新单个工具
    pub async fn update_tool(&self, tool: &ToolInfo) -> UpdateResult {
        self.run_update(tool).await.1
    }

    /// 顺序更新多个工具，单个失败不会中断批量更新
    pub async fn batch_update(&self, tools: &[ToolInfo]) -> BatchUpdateResult {
        tracing::info!(count = tools.len(), "开始批量更新");
        let mut results = Vec::with_capacity(tools.len());
        for tool in tools {
            results.push(self.update_tool(tool).await);
        }

        let batch = BatchUpdateResult::from_results(results);
        tracing::info!(
            success = batch.success_count,
            failure = batch.failure_count,
            "批量更新完成"
        );
        batch
    }

    /// 通过指定包管理器安装新工具（无备份阶段）
    pub async fn install_tool(
        &self,
        tool_name: &str,
        method: InstallMethod,
        package: &str,
    ) -> UpdateResult {
        let mut run = UpdateRun::new(tool_name);
        run.note(format!("通过 {method} 安装 {tool_name}..."));

        let command = if tool_name.trim().is_empty() {
            Err(EngineError::InvalidInput("工具名称不能为空".to_string()))
        } else {
            package_manager::install_command(method, package)
        };
        let outcome = match command {
            Ok(command) => self.execute_mutation(&command, &mut run).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(tool = %tool_name, method = %method, "工具安装完成");
                run.note("安装完成");
                UpdateResult {
                    success: true,
                    tool_name: tool_name.to_string(),
                    old_version: None,
                    new_version: Some(INSTALLED_MARKER.to_string()),
                    error: None,
                    log: Some(run.log),
                }
            }
            Err(e) => {
                tracing::warn!(tool = %tool_name, method = %method, error = %e, "工具安装失败");
                run.note(format!("安装失败: {e}"));
                UpdateResult {
                    success: false,
                    tool_name: tool_name.to_string(),
                    old_version: None,
                    new_version: None,
                    error: Some(e.to_string()),
                    log: Some(run.log),
                }
            }
        }
    }

    /// 执行状态机，返回结束时所处的阶段和结果
    async fn run_update(&self, tool: &ToolInfo) -> (UpdatePhase, UpdateResult) {
        let started = Instant::now();
        let mut run = UpdateRun::new(&tool.name);

        run.enter(UpdatePhase::Validating);
        if tool.status == ToolStatus::NotInstalled {
            run.note(format!("{} 未安装，无法更新", tool.name));
            let error = EngineError::InvalidInput(format!("{} 未安装", tool.name));
            return (run.phase, failure(tool, error.to_string(), run.log));
        }

        tracing::info!(
            tool = %tool.name,
            method = %tool.install_method,
            version = ?tool.current_version,
            "开始更新工具"
        );

        run.enter(UpdatePhase::BackingUp);
        self.backup_phase(tool, &mut run).await;

        let definition = self.catalog.get(&tool.name);
        match self.mutate_and_verify(tool, definition, &mut run).await {
            Ok(new_version) => {
                run.enter(UpdatePhase::Succeeded);
                run.note(format!(
                    "更新完成，用时 {:.2}s",
                    started.elapsed().as_secs_f64()
                ));
                tracing::info!(tool = %tool.name, version = %new_version, "工具更新成功");
                let result = UpdateResult {
                    success: true,
                    tool_name: tool.name.clone(),
                    old_version: tool.current_version.clone(),
                    new_version: Some(new_version),
                    error: None,
                    log: Some(run.log),
                };
                (UpdatePhase::Succeeded, result)
            }
            Err(update_error) => {
                tracing::warn!(tool = %tool.name, error = %update_error, "更新失败，尝试回滚");
                run.note(format!("更新失败: {update_error}"));

                run.enter(UpdatePhase::RollingBack);
                run.note("尝试回滚...");
                match self.rollback(tool, definition, &mut run).await {
                    Ok(()) => {
                        run.enter(UpdatePhase::RolledBack);
                        run.note("回滚成功");
                    }
                    Err(rollback_error) => {
                        tracing::error!(
                            tool = %tool.name,
                            error = %rollback_error,
                            "回滚失败"
                        );
                        run.enter(UpdatePhase::RollbackFailed);
                        run.note(format!("{rollback_error}"));
                        run.note(format!("原始错误: {update_error}"));
                    }
                }
                let phase = run.phase;
                (phase, failure(tool, update_error.to_string(), run.log))
            }
        }
    }

    async fn backup_phase(&self, tool: &ToolInfo, run: &mut UpdateRun) {
        if !self.auto_backup.load(Ordering::Relaxed) {
            run.note("自动备份已关闭，跳过备份");
            return;
        }

        run.note(format!("正在备份 {}...", tool.name));
        match self.write_backup(tool).await {
            Ok(path) => run.note(format!("备份已保存: {}", path.display())),
            Err(e) => {
                tracing::warn!(tool = %tool.name, error = ?e, "备份失败，继续更新");
                run.note(format!("备份失败（继续更新）: {e}"));
            }
        }
    }

    /// 写入备份清单，目录名保证唯一
    async fn write_backup(&self, tool: &ToolInfo) -> EngineResult<PathBuf> {
        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| EngineError::io(&self.backup_dir, e))?;

        let base = format!(
            "{}-{}-{}",
            sanitize_segment(&tool.name),
            sanitize_segment(tool.current_version.as_deref().unwrap_or("unknown")),
            Utc::now().timestamp_millis()
        );

        let mut dir = self.backup_dir.join(&base);
        let mut suffix = 1;
        loop {
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    dir = self.backup_dir.join(format!("{base}-{suffix}"));
                    suffix += 1;
                }
                Err(e) => return Err(EngineError::io(&dir, e)),
            }
        }

        let manifest = BackupManifest {
            name: tool.name.clone(),
            version: tool.current_version.clone(),
            install_method: tool.install_method,
            install_path: tool.install_path.clone(),
            backup_date: Utc::now(),
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(&manifest)?;
        tokio::fs::write(&manifest_path, content)
            .await
            .map_err(|e| EngineError::io(&manifest_path, e))?;

        tracing::debug!(tool = %tool.name, path = %dir.display(), "备份清单已写入");
        Ok(dir)
    }

    async fn mutate_and_verify(
        &self,
        tool: &ToolInfo,
        definition: Option<&ToolDefinition>,
        run: &mut UpdateRun,
    ) -> EngineResult<String> {
        run.enter(UpdatePhase::Mutating);
        run.note(format!("通过 {} 更新 {}...", tool.install_method, tool.name));
        let package = package_manager::package_name(definition, &tool.name, tool.install_method);
        let command = package_manager::update_command(tool.install_method, package)?;
        self.execute_mutation(&command, run).await?;

        run.enter(UpdatePhase::Verifying);
        run.note("校验更新结果...");
        let probe = definition
            .map(ToolDefinition::probe_command)
            .unwrap_or_else(|| format!("{} --version", tool.name));
        let result = self.runner.run(&probe, PROBE_TIMEOUT).await;
        let version = if result.success {
            extract_version(&result.combined_output())
        } else {
            None
        };

        match version {
            Some(version) => {
                run.note(format!("当前版本: {version}"));
                Ok(version)
            }
            None => Err(EngineError::VerificationFailure(format!(
                "{probe} 未返回版本号"
            ))),
        }
    }

    async fn rollback(
        &self,
        tool: &ToolInfo,
        definition: Option<&ToolDefinition>,
        run: &mut UpdateRun,
    ) -> EngineResult<()> {
        self.try_rollback(tool, definition, run)
            .await
            .map_err(|e| EngineError::RollbackFailure(e.to_string()))
    }

    async fn try_rollback(
        &self,
        tool: &ToolInfo,
        definition: Option<&ToolDefinition>,
        run: &mut UpdateRun,
    ) -> EngineResult<()> {
        let version = tool
            .current_version
            .as_deref()
            .ok_or_else(|| EngineError::InvalidInput("没有可回滚的版本".to_string()))?;
        let package = package_manager::package_name(definition, &tool.name, tool.install_method);
        let command = package_manager::rollback_command(tool.install_method, package, version)?;
        self.execute_mutation(&command, run).await
    }

    /// 执行变更类命令，输出写入日志
    async fn execute_mutation(&self, command: &str, run: &mut UpdateRun) -> EngineResult<()> {
        run.note(format!("执行: {command}"));
        let result = self.runner.run(command, MUTATION_TIMEOUT).await;
        let output = result.combined_output();
        if !output.is_empty() {
            run.note(output);
        }
        result.check(command, MUTATION_TIMEOUT).map(|_| ())
    }
}

fn failure(tool: &ToolInfo, error: String, log: String) -> UpdateResult {
    UpdateResult {
        success: false,
        tool_name: tool.name.clone(),
        old_version: tool.current_version.clone(),
        new_version: None,
        error: Some(error),
        log: Some(log),
    }
}

/// 备份目录名中只保留安全字符
fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
