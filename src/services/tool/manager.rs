use super::catalog::Catalog;
use super::detector::ToolDetector;
use super::updater::Updater;
use super::version::VersionService;
use crate::core::error::EngineResult;
use crate::models::{
    AppConfig, BatchUpdateResult, InstallMethod, ToolDefinition, ToolInfo, ToolStatus,
    UpdateResult,
};
use crate::utils::command::{CommandExecutor, CommandRunner};
use crate::utils::version::is_outdated;
use futures_util::future::join_all;
use std::sync::Arc;

/// 工具生命周期引擎
///
/// 启动时显式组装目录、检测器、版本服务与更新器，之后以引用形式交给命令层使用。
pub struct ToolManager {
    catalog: Arc<Catalog>,
    detector: ToolDetector,
    versions: VersionService,
    updater: Updater,
}

impl ToolManager {
    pub fn new(
        catalog: Arc<Catalog>,
        detector: ToolDetector,
        versions: VersionService,
        updater: Updater,
    ) -> Self {
        ToolManager {
            catalog,
            detector,
            versions,
            updater,
        }
    }

    /// 按应用配置组装引擎（内置目录 + 系统命令执行器）
    pub fn from_config(config: &AppConfig) -> EngineResult<Self> {
        let catalog = Arc::new(Catalog::builtin());
        let runner: Arc<dyn CommandRunner> = Arc::new(CommandExecutor::new());

        let detector = ToolDetector::new(catalog.clone(), runner.clone());
        let versions = VersionService::new(config.proxy.as_ref(), config.github_token.clone())?;
        let updater = Updater::new(catalog.clone(), runner)?;
        updater.set_auto_backup(config.auto_backup);

        Ok(Self::new(catalog, detector, versions, updater))
    }

    pub async fn initialize(&self) {
        self.updater.initialize().await;
    }

    /// 完整的工具目录
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.catalog.definitions().to_vec()
    }

    pub async fn scan_tools(&self) -> Vec<ToolInfo> {
        self.detector.scan_all_tools().await
    }

    /// 并发刷新每个工具的最新版本与过期状态，顺序与输入一致
    pub async fn check_versions(&self, tools: Vec<ToolInfo>) -> Vec<ToolInfo> {
        tracing::info!(count = tools.len(), "检查最新版本");
        join_all(tools.into_iter().map(|tool| self.refresh_version(tool))).await
    }

    async fn refresh_version(&self, mut tool: ToolInfo) -> ToolInfo {
        let Some(definition) = self.catalog.get(&tool.name) else {
            return tool;
        };
        let Some(record) = self.versions.get_latest_version(definition).await else {
            return tool;
        };

        let outdated = is_outdated(tool.current_version.as_deref(), Some(record.version.as_str()));
        tool.latest_version = Some(record.version);
        tool.is_outdated = outdated;
        if outdated {
            tool.status = ToolStatus::Outdated;
        }
        tool
    }

    pub async fn update_tool(&self, tool: &ToolInfo) -> UpdateResult {
        self.updater.update_tool(tool).await
    }

    pub async fn batch_update(&self, tools: &[ToolInfo]) -> BatchUpdateResult {
        self.updater.batch_update(tools).await
    }

    pub async fn install_tool(
        &self,
        tool_name: &str,
        method: InstallMethod,
        package: &str,
    ) -> UpdateResult {
        self.updater.install_tool(tool_name, method, package).await
    }

    pub fn clear_cache(&self) {
        self.versions.clear_cache();
    }

    /// 配置变更后同步自动备份开关
    pub fn apply_config(&self, config: &AppConfig) {
        self.updater.set_auto_backup(config.auto_backup);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PackageSources;
    use crate::services::tool::sources::ProviderEndpoints;
    use crate::utils::command::testing::{ok, ScriptedRunner};
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_definition() -> ToolDefinition {
        ToolDefinition {
            name: "sample".to_string(),
            display_name: "Sample".to_string(),
            command: "sample".to_string(),
            version_flag: "--version".to_string(),
            version_pattern: r"(\d+\.\d+\.\d+)".to_string(),
            install_methods: PackageSources {
                npm: Some("sample".to_string()),
                ..PackageSources::default()
            },
            config_paths: vec![],
            homepage: None,
        }
    }

    fn manager(server: &MockServer, runner: ScriptedRunner, backup_dir: &std::path::Path) -> ToolManager {
        let catalog = Arc::new(Catalog::new(vec![sample_definition()]));
        let runner: Arc<dyn CommandRunner> = Arc::new(runner);
        ToolManager::new(
            catalog.clone(),
            ToolDetector::new(catalog.clone(), runner.clone()),
            VersionService::with_endpoints(
                reqwest::Client::new(),
                ProviderEndpoints::single(&server.uri()),
                None,
            ),
            Updater::with_backup_dir(catalog, runner, backup_dir.to_path_buf()),
        )
    }

    async fn npm_latest(server: &MockServer, version: &str) {
        Mock::given(method("GET"))
            .and(path("/sample"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dist-tags": { "latest": version },
                "time": { version: "2024-05-01T12:00:00Z" }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_scan_check_update_flow() {
        let server = MockServer::start().await;
        npm_latest(&server, "1.1.0").await;
        let dir = tempfile::tempdir().unwrap();

        let runner = ScriptedRunner::new()
            .with_program("sample", "/usr/lib/node_modules/sample/bin/sample")
            .on("sample --version", ok("1.0.0"))
            .on("sample --version", ok("1.1.0"))
            .on("npm update -g sample", ok("updated 1 package"));
        let manager = manager(&server, runner, dir.path());

        let scanned = manager.scan_tools().await;
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].status, ToolStatus::Installed);
        assert_eq!(scanned[0].install_method, InstallMethod::Npm);

        let checked = manager.check_versions(scanned).await;
        assert_eq!(checked[0].latest_version.as_deref(), Some("1.1.0"));
        assert!(checked[0].is_outdated);
        assert_eq!(checked[0].status, ToolStatus::Outdated);

        let result = manager.update_tool(&checked[0]).await;
        assert!(result.success, "{:?}", result.log);
        assert_eq!(result.old_version.as_deref(), Some("1.0.0"));
        assert_eq!(result.new_version.as_deref(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_check_versions_passes_unknown_tools_through() {
        let server = MockServer::start().await;
        npm_latest(&server, "1.0.0").await;
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&server, ScriptedRunner::new(), dir.path());

        let stranger = ToolInfo {
            name: "stranger".to_string(),
            display_name: "Stranger".to_string(),
            current_version: Some("0.1.0".to_string()),
            latest_version: None,
            install_path: None,
            install_method: InstallMethod::Unknown,
            config_path: None,
            last_checked: Utc::now(),
            status: ToolStatus::Installed,
            is_outdated: false,
            error: None,
        };
        let mut current = stranger.clone();
        current.name = "sample".to_string();
        current.current_version = Some("1.0.0".to_string());

        let checked = manager.check_versions(vec![stranger.clone(), current]).await;
        assert_eq!(checked[0], stranger);
        assert_eq!(checked[1].latest_version.as_deref(), Some("1.0.0"));
        assert!(!checked[1].is_outdated);
        assert_eq!(checked[1].status, ToolStatus::Installed);
    }
}
