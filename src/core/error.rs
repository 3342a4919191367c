//! 统一错误类型定义
//!
//! 使用 `thiserror` 定义工具生命周期引擎的所有错误类型。
//! 引擎的公开操作会把这些错误转换为结构化结果（`ToolInfo.status`、`UpdateResult.error`），
//! 错误本身不会穿透到表现层。

use std::path::PathBuf;
use thiserror::Error;

/// 引擎统一错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 探测命令不在 PATH 中
    #[error("未找到命令: {0}")]
    NotFound(String),

    /// 命令存在但无法提取版本号
    #[error("版本探测失败: {0}")]
    ProbeFailure(String),

    /// 版本源请求失败或超时
    #[error("版本源 {provider} 不可用: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    /// 该安装方式不支持此操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// 更新命令成功但更新后无法获取版本号
    #[error("更新校验失败: {0}")]
    VerificationFailure(String),

    /// 回滚命令本身失败
    #[error("回滚失败: {0}")]
    RollbackFailure(String),

    /// 外部命令返回非零退出码
    #[error("命令执行失败: {command}: {reason}")]
    CommandFailed { command: String, reason: String },

    /// 外部命令超时
    #[error("命令执行超时（{secs} 秒）: {command}")]
    Timeout { command: String, secs: u64 },

    /// 调用方传入的参数非法
    #[error("无效的参数: {0}")]
    InvalidInput(String),

    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON 序列化/反序列化错误
    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP 客户端错误
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// 工具定义中的版本正则无效
    #[error("版本正则无效: {0}")]
    Regex(#[from] regex::Error),

    #[error("无法获取用户主目录")]
    HomeDirUnavailable,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 是否属于检测阶段的“预期失败”（降级为 not-installed 而非 error）
    pub fn is_expected_absence(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::ProbeFailure(_))
    }
}
