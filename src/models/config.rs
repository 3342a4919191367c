// 全局配置结构，放在 models 以便在库和二进制之间共享
use serde::{Deserialize, Serialize};

/// 代理协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

/// 版本检查使用的 HTTP 代理
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// 日志目录，缺省为 ~/.actm/logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// 应用配置
///
/// 所有字段都有默认值，旧版本或部分缺失的配置文件也能正常加载。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_true")]
    pub auto_check_updates: bool,
    /// 自动检查间隔（小时）
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,
    #[serde(default)]
    pub auto_startup: bool,
    #[serde(default = "default_true")]
    pub show_notifications: bool,
    #[serde(default = "default_true")]
    pub auto_backup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySettings>,
    /// GitHub API token，用于提升匿名请求配额
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_true() -> bool {
    true
}

fn default_check_interval() -> u32 {
    6
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            auto_check_updates: true,
            check_interval: default_check_interval(),
            auto_startup: false,
            show_notifications: true,
            auto_backup: true,
            proxy: None,
            github_token: None,
            log: LogConfig::default(),
        }
    }
}

/// 部分更新配置（set-config 的输入），只有出现的字段会被写入
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfigPatch {
    pub auto_check_updates: Option<bool>,
    pub check_interval: Option<u32>,
    pub auto_startup: Option<bool>,
    pub show_notifications: Option<bool>,
    pub auto_backup: Option<bool>,
    pub proxy: Option<ProxySettings>,
    pub github_token: Option<String>,
    pub log: Option<LogConfig>,
}

impl AppConfig {
    /// 合并部分配置，返回日志级别是否发生变化
    pub fn apply(&mut self, patch: AppConfigPatch) -> bool {
        let old_level = self.log.level;

        if let Some(v) = patch.auto_check_updates {
            self.auto_check_updates = v;
        }
        if let Some(v) = patch.check_interval {
            self.check_interval = v;
        }
        if let Some(v) = patch.auto_startup {
            self.auto_startup = v;
        }
        if let Some(v) = patch.show_notifications {
            self.show_notifications = v;
        }
        if let Some(v) = patch.auto_backup {
            self.auto_backup = v;
        }
        if patch.proxy.is_some() {
            self.proxy = patch.proxy;
        }
        if patch.github_token.is_some() {
            self.github_token = patch.github_token;
        }
        if let Some(log) = patch.log {
            self.log = log;
        }

        self.log.level != old_level
    }
}
