use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 安装方式（工具由哪个包管理器提供）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallMethod {
    Npm,             // npm 全局包
    Pip,             // PyPI
    Brew,            // Homebrew formula
    Binary,          // 独立二进制
    VscodeExtension, // VS Code 扩展
    Unknown,
}

impl InstallMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            InstallMethod::Npm => "npm",
            InstallMethod::Pip => "pip",
            InstallMethod::Brew => "brew",
            InstallMethod::Binary => "binary",
            InstallMethod::VscodeExtension => "vscode-extension",
            InstallMethod::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 工具状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolStatus {
    Installed,
    Outdated,
    NotInstalled,
    Error,
}

/// GitHub 仓库坐标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRepo {
    pub owner: String,
    pub repo: String,
}

/// 各版本源 / 包管理器下的包标识
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brew: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubRepo>,
    /// VS Code 扩展 ID（如 "saoudrizwan.claude-dev"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vscode: Option<String>,
}

impl PackageSources {
    /// 获取某个包管理器下声明的包名
    pub fn package_for(&self, method: InstallMethod) -> Option<&str> {
        match method {
            InstallMethod::Npm => self.npm.as_deref(),
            InstallMethod::Pip => self.pip.as_deref(),
            InstallMethod::Brew => self.brew.as_deref(),
            InstallMethod::VscodeExtension => self.vscode.as_deref(),
            InstallMethod::Binary | InstallMethod::Unknown => None,
        }
    }
}

/// 工具定义（静态目录中的一项，加载后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// 工具唯一标识（如 "claude"）
    pub name: String,
    /// 显示名称（如 "Claude Code"）
    pub display_name: String,
    /// 探测命令（如 "claude"）
    pub command: String,
    /// 版本参数（如 "--version"）
    pub version_flag: String,
    /// 版本提取正则，第一个捕获组为版本号
    pub version_pattern: String,
    pub install_methods: PackageSources,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl ToolDefinition {
    /// 版本探测命令行（如 "claude --version"）
    pub fn probe_command(&self) -> String {
        format!("{} {}", self.command, self.version_flag)
    }
}

/// 一次检测得到的工具信息，每次扫描重新生成，不做持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub display_name: String,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub install_path: Option<String>,
    pub install_method: InstallMethod,
    pub config_path: Option<String>,
    pub last_checked: DateTime<Utc>,
    pub status: ToolStatus,
    pub is_outdated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolInfo {
    /// 未安装：版本与路径全部为空
    pub fn not_installed(definition: &ToolDefinition) -> Self {
        Self::empty(definition, ToolStatus::NotInstalled, None)
    }

    /// 检测出现意外错误：除错误信息外全部为空
    pub fn failed(definition: &ToolDefinition, error: String) -> Self {
        Self::empty(definition, ToolStatus::Error, Some(error))
    }

    fn empty(definition: &ToolDefinition, status: ToolStatus, error: Option<String>) -> Self {
        ToolInfo {
            name: definition.name.clone(),
            display_name: definition.display_name.clone(),
            current_version: None,
            latest_version: None,
            install_path: None,
            install_method: InstallMethod::Unknown,
            config_path: None,
            last_checked: Utc::now(),
            status,
            is_outdated: false,
            error,
        }
    }
}
