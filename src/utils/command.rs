use crate::core::error::{EngineError, EngineResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// 版本探测、包列表等短命令的超时
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// 更新 / 安装 / 回滚命令的超时
pub const MUTATION_TIMEOUT: Duration = Duration::from_secs(300);

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn from_output(output: Output) -> Self {
        CommandResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
            timed_out: false,
        }
    }

    pub fn from_error(error: std::io::Error) -> Self {
        CommandResult {
            success: false,
            stdout: String::new(),
            stderr: error.to_string(),
            exit_code: None,
            timed_out: false,
        }
    }

    pub fn timed_out(timeout: Duration) -> Self {
        CommandResult {
            success: false,
            stdout: String::new(),
            stderr: format!("执行超时（{} 秒）", timeout.as_secs()),
            exit_code: None,
            timed_out: true,
        }
    }

    /// stdout 与 stderr 拼接后的输出（版本号可能打印在任意一个流）
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
            (false, true) => self.stdout.clone(),
            _ => self.stderr.clone(),
        }
    }

    /// 将失败 / 超时转换为错误
    pub fn check(self, command: &str, timeout: Duration) -> EngineResult<CommandResult> {
        if self.timed_out {
            return Err(EngineError::Timeout {
                command: command.to_string(),
                secs: timeout.as_secs(),
            });
        }
        if !self.success {
            let reason = if self.stderr.is_empty() {
                match self.exit_code {
                    Some(code) => format!("退出码 {code}"),
                    None => "进程异常退出".to_string(),
                }
            } else {
                self.stderr.clone()
            };
            return Err(EngineError::CommandFailed {
                command: command.to_string(),
                reason,
            });
        }
        Ok(self)
    }
}

/// 外部命令执行接口
///
/// 检测器和更新器只通过此接口接触系统进程，测试中用脚本化实现替换。
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 在 PATH 中查找命令的绝对路径
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// 通过系统 shell 执行命令，超时后终止子进程
    async fn run(&self, command: &str, timeout: Duration) -> CommandResult;
}

/// 命令执行器
pub struct CommandExecutor {
    enhanced_path: OsString,
}

impl CommandExecutor {
    pub fn new() -> Self {
        CommandExecutor {
            enhanced_path: build_enhanced_path(),
        }
    }

    fn shell_command(command_str: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command_str]);
            #[cfg(windows)]
            cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command_str]);
            cmd
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for CommandExecutor {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_default();
        which::which_in(program, Some(&self.enhanced_path), cwd).ok()
    }

    async fn run(&self, command_str: &str, timeout: Duration) -> CommandResult {
        let mut cmd = Self::shell_command(command_str);
        cmd.env("PATH", &self.enhanced_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(command = %command_str, timeout_secs = timeout.as_secs(), "执行命令");

        let result = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => CommandResult::from_output(output),
            Ok(Err(e)) => CommandResult::from_error(e),
            Err(_) => CommandResult::timed_out(timeout),
        };

        tracing::debug!(
            command = %command_str,
            success = result.success,
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            "命令执行结束"
        );

        result
    }
}

/// 构建增强的 PATH
///
/// 从桌面环境启动时继承的 PATH 往往缺少用户级的包管理器目录，这里补齐常见位置。
fn build_enhanced_path() -> OsString {
    let current = std::env::var_os("PATH").unwrap_or_default();
    let mut paths: Vec<PathBuf> = std::env::split_paths(&current).collect();

    let mut extras = Vec::new();
    if let Some(home) = dirs::home_dir() {
        extras.push(home.join(".npm-global").join("bin"));
        extras.push(home.join(".local").join("bin"));
    }
    if !cfg!(windows) {
        extras.push(PathBuf::from("/opt/homebrew/bin"));
        extras.push(PathBuf::from("/usr/local/bin"));
    }

    for extra in extras {
        if !paths.contains(&extra) {
            paths.push(extra);
        }
    }

    std::env::join_paths(paths).unwrap_or(current)
}
