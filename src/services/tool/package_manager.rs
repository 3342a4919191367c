//! 包管理器命令
//!
//! 每个安装方式对应的更新 / 回滚 / 安装命令，以及用于交叉校验的已安装包列表。
//! 所有分支都对 `InstallMethod` 做穷尽匹配，新增安装方式时编译器会指出需要补充的位置。

use crate::core::error::{EngineError, EngineResult};
use crate::models::{InstallMethod, ToolDefinition};
use crate::utils::command::{CommandRunner, PROBE_TIMEOUT};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9@/._+=~-]+$").expect("invalid identifier regex"));

/// 校验即将拼接进 shell 命令的包名 / 版本号
pub fn validate_identifier(value: &str) -> EngineResult<&str> {
    if IDENTIFIER_REGEX.is_match(value) {
        Ok(value)
    } else {
        Err(EngineError::InvalidInput(format!("非法的包标识: {value:?}")))
    }
}

/// 工具在某个包管理器下的包名，未声明时使用工具名
pub fn package_name<'a>(
    definition: Option<&'a ToolDefinition>,
    tool_name: &'a str,
    method: InstallMethod,
) -> &'a str {
    definition
        .and_then(|def| def.install_methods.package_for(method))
        .unwrap_or(tool_name)
}

/// 更新命令
pub fn update_command(method: InstallMethod, package: &str) -> EngineResult<String> {
    let package = validate_identifier(package)?;
    match method {
        InstallMethod::Npm => Ok(format!("npm update -g {package}")),
        InstallMethod::Pip => Ok(format!("pip install --upgrade {package}")),
        InstallMethod::Brew => Ok(format!("brew upgrade {package}")),
        InstallMethod::Binary => Err(EngineError::Unsupported(
            "独立二进制的更新尚未实现".to_string(),
        )),
        InstallMethod::VscodeExtension | InstallMethod::Unknown => Err(EngineError::Unsupported(
            format!("安装方式 {method} 不支持更新"),
        )),
    }
}

/// 回滚命令（重新安装指定版本）
pub fn rollback_command(method: InstallMethod, package: &str, version: &str) -> EngineResult<String> {
    let package = validate_identifier(package)?;
    let version = validate_identifier(version)?;
    match method {
        InstallMethod::Npm => Ok(format!("npm install -g {package}@{version}")),
        InstallMethod::Pip => Ok(format!("pip install {package}=={version}")),
        InstallMethod::Brew => Err(EngineError::Unsupported(
            "Homebrew 不支持回滚到指定版本".to_string(),
        )),
        InstallMethod::Binary | InstallMethod::VscodeExtension | InstallMethod::Unknown => Err(
            EngineError::Unsupported(format!("安装方式 {method} 不支持回滚")),
        ),
    }
}

/// 安装命令
pub fn install_command(method: InstallMethod, package: &str) -> EngineResult<String> {
    let package = validate_identifier(package)?;
    match method {
        InstallMethod::Npm => Ok(format!("npm install -g {package}")),
        InstallMethod::Pip => Ok(format!("pip install {package}")),
        InstallMethod::Brew => Ok(format!("brew install {package}")),
        InstallMethod::Binary | InstallMethod::VscodeExtension | InstallMethod::Unknown => Err(
            EngineError::Unsupported(format!("安装方式 {method} 不支持安装")),
        ),
    }
}

/// 列出已安装包的命令
pub fn listing_command(method: InstallMethod) -> Option<&'static str> {
    match method {
        InstallMethod::Npm => Some("npm list -g --depth=0"),
        InstallMethod::Pip => Some("pip list"),
        InstallMethod::Brew => Some("brew list"),
        InstallMethod::Binary | InstallMethod::VscodeExtension | InstallMethod::Unknown => None,
    }
}

/// 包是否出现在该包管理器的已安装列表中
///
/// 列表命令失败或超时视为不在列表中。
pub async fn is_listed(runner: &dyn CommandRunner, method: InstallMethod, package: &str) -> bool {
    let Some(command) = listing_command(method) else {
        return false;
    };

    let result = runner.run(command, PROBE_TIMEOUT).await;
    if !result.success {
        tracing::debug!(
            command = command,
            stderr = %result.stderr,
            "包列表命令失败，视为未安装"
        );
        return false;
    }
    result.stdout.contains(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command::testing::{failed, ok, ScriptedRunner};

    #[test]
    fn test_command_table() {
        assert_eq!(update_command(InstallMethod::Npm, "sample").unwrap(), "npm update -g sample");
        assert_eq!(
            update_command(InstallMethod::Pip, "sample").unwrap(),
            "pip install --upgrade sample"
        );
        assert_eq!(update_command(InstallMethod::Brew, "sample").unwrap(), "brew upgrade sample");

        assert_eq!(
            rollback_command(InstallMethod::Npm, "sample", "1.0.0").unwrap(),
            "npm install -g sample@1.0.0"
        );
        assert_eq!(
            rollback_command(InstallMethod::Pip, "sample", "1.0.0").unwrap(),
            "pip install sample==1.0.0"
        );

        assert_eq!(
            install_command(InstallMethod::Npm, "@scope/pkg").unwrap(),
            "npm install -g @scope/pkg"
        );
        assert_eq!(install_command(InstallMethod::Brew, "sample").unwrap(), "brew install sample");
    }

    #[test]
    fn test_unsupported_operations() {
        for method in [InstallMethod::Binary, InstallMethod::VscodeExtension, InstallMethod::Unknown] {
            assert!(matches!(update_command(method, "x"), Err(EngineError::Unsupported(_))));
            assert!(matches!(install_command(method, "x"), Err(EngineError::Unsupported(_))));
            assert!(matches!(rollback_command(method, "x", "1.0.0"), Err(EngineError::Unsupported(_))));
        }
        assert!(matches!(
            rollback_command(InstallMethod::Brew, "sample", "1.0.0"),
            Err(EngineError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_shell_metacharacters() {
        for bad in ["sample; rm -rf ~", "a b", "$(whoami)", "pkg|cat", ""] {
            assert!(matches!(
                update_command(InstallMethod::Npm, bad),
                Err(EngineError::InvalidInput(_))
            ));
        }
        assert!(rollback_command(InstallMethod::Npm, "sample", "1.0.0 && x").is_err());
        assert!(validate_identifier("@anthropic-ai/claude-code").is_ok());
        assert!(validate_identifier("pkg==1.0.0~rc+1").is_ok());
    }

    #[test]
    fn test_package_name_falls_back_to_tool_name() {
        assert_eq!(package_name(None, "sample", InstallMethod::Npm), "sample");
    }

    #[tokio::test]
    async fn test_is_listed() {
        let runner = ScriptedRunner::new()
            .on("npm list -g --depth=0", ok("/usr/lib\n├── sample@1.0.0\n└── npm@10.0.0"))
            .on("pip list", failed("pip: command not found"));

        assert!(is_listed(&runner, InstallMethod::Npm, "sample").await);
        assert!(!is_listed(&runner, InstallMethod::Npm, "other").await);
        assert!(!is_listed(&runner, InstallMethod::Pip, "sample").await);
        assert!(!is_listed(&runner, InstallMethod::Binary, "sample").await);
        assert!(!runner.was_called("brew list"));
    }
}
