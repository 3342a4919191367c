use super::tool::InstallMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单个工具的更新 / 安装结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub success: bool,
    pub tool_name: String,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 面向用户的执行日志
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

/// 批量更新结果，计数严格等于 results 中的成功 / 失败个数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResult {
    pub results: Vec<UpdateResult>,
    pub success_count: usize,
    pub failure_count: usize,
}

impl BatchUpdateResult {
    pub fn from_results(results: Vec<UpdateResult>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        let failure_count = results.len() - success_count;
        Self {
            results,
            success_count,
            failure_count,
        }
    }
}

/// 备份清单（写入 `<backup>/<name>-<version>-<ts>/version.json`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    pub name: String,
    pub version: Option<String>,
    pub install_method: InstallMethod,
    pub install_path: Option<String>,
    pub backup_date: DateTime<Utc>,
}

/// 更新状态机的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePhase {
    Idle,
    Validating,
    BackingUp,
    Mutating,
    Verifying,
    Succeeded,
    RollingBack,
    RolledBack,
    RollbackFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool) -> UpdateResult {
        UpdateResult {
            success,
            tool_name: "t".to_string(),
            old_version: None,
            new_version: None,
            error: None,
            log: None,
        }
    }

    #[test]
    fn test_batch_counts_are_exact() {
        let batch = BatchUpdateResult::from_results(vec![result(true), result(false), result(true)]);
        assert_eq!(batch.success_count, 2);
        assert_eq!(batch.failure_count, 1);
        assert_eq!(batch.success_count + batch.failure_count, batch.results.len());

        let empty = BatchUpdateResult::from_results(vec![]);
        assert_eq!((empty.success_count, empty.failure_count), (0, 0));
    }

    #[test]
    fn test_manifest_wire_format() {
        let manifest = BackupManifest {
            name: "claude".to_string(),
            version: Some("1.0.0".to_string()),
            install_method: InstallMethod::Npm,
            install_path: Some("/usr/local/bin/claude".to_string()),
            backup_date: Utc::now(),
        };
        let json = serde_json::to_value(&manifest).unwrap();
        for key in ["name", "version", "installMethod", "installPath", "backupDate"] {
            assert!(json.get(key).is_some(), "缺少字段 {key}");
        }
        assert_eq!(json["installMethod"], "npm");
    }
}
