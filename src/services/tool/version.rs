use super::cache::VersionCache;
use super::sources::{self, ProviderEndpoints, VersionProvider};
use crate::core::error::EngineResult;
use crate::core::http::build_http_client;
use crate::models::{ProxySettings, ToolDefinition, VersionRecord};
use reqwest::Client;
use std::sync::Mutex;

/// 版本服务
///
/// 按 npm → PyPI → Homebrew → GitHub 的顺序查询最新版本，第一个成功的版本源即为结果。
/// 结果按工具名缓存 24 小时；全部失败时返回 None 且不写缓存。
pub struct VersionService {
    client: Client,
    endpoints: ProviderEndpoints,
    github_token: Option<String>,
    cache: Mutex<VersionCache>,
}

impl VersionService {
    pub fn new(proxy: Option<&ProxySettings>, github_token: Option<String>) -> EngineResult<Self> {
        let client = build_http_client(proxy)?;
        Ok(Self::with_endpoints(
            client,
            ProviderEndpoints::default(),
            github_token,
        ))
    }

    pub fn with_endpoints(
        client: Client,
        endpoints: ProviderEndpoints,
        github_token: Option<String>,
    ) -> Self {
        VersionService {
            client,
            endpoints,
            github_token,
            cache: Mutex::new(VersionCache::default()),
        }
    }

    /// 获取工具的最新版本
    pub async fn get_latest_version(&self, definition: &ToolDefinition) -> Option<VersionRecord> {
        if let Some(cached) = self.cached(&definition.name) {
            tracing::debug!(tool = %definition.name, version = %cached.version, "版本缓存命中");
            return Some(cached);
        }

        for provider in VersionProvider::PRIORITY {
            let result = match self.query(provider, definition).await {
                Some(result) => result,
                None => continue,
            };

            match result {
                Ok(record) => {
                    tracing::info!(
                        tool = %definition.name,
                        provider = provider.name(),
                        version = %record.version,
                        "获取最新版本成功"
                    );
                    self.store(&definition.name, record.clone());
                    return Some(record);
                }
                Err(e) => {
                    tracing::warn!(
                        tool = %definition.name,
                        provider = provider.name(),
                        error = %e,
                        "版本源不可用，尝试下一个"
                    );
                }
            }
        }

        tracing::warn!(tool = %definition.name, "所有版本源均未返回结果");
        None
    }

    /// 清空版本缓存
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
        tracing::info!("版本缓存已清空");
    }

    /// 工具未声明该版本源时返回 None
    async fn query(
        &self,
        provider: VersionProvider,
        definition: &ToolDefinition,
    ) -> Option<EngineResult<VersionRecord>> {
        let declared = &definition.install_methods;
        let result = match provider {
            VersionProvider::Npm => {
                let package = declared.npm.as_deref()?;
                sources::fetch_npm(&self.client, &self.endpoints.npm, package).await
            }
            VersionProvider::PyPi => {
                let package = declared.pip.as_deref()?;
                sources::fetch_pypi(&self.client, &self.endpoints.pypi, package).await
            }
            VersionProvider::Brew => {
                let formula = declared.brew.as_deref()?;
                sources::fetch_brew(&self.client, &self.endpoints.brew, formula).await
            }
            VersionProvider::Github => {
                let repo = declared.github.as_ref()?;
                sources::fetch_github(
                    &self.client,
                    &self.endpoints.github,
                    repo,
                    self.github_token.as_deref(),
                )
                .await
            }
        };
        Some(result)
    }

    fn cached(&self, tool: &str) -> Option<VersionRecord> {
        self.cache.lock().ok()?.get(tool)
    }

    fn store(&self, tool: &str, record: VersionRecord) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(tool, record);
        }
    }
}
