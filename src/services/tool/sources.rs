//! 版本源
//!
//! 每个版本源都有显式的响应结构，在边界处完成反序列化。
//! 请求失败、非 2xx 状态码、超时、响应无法解析一律映射为 `ProviderUnavailable`，
//! 由上层继续尝试下一个版本源。

use crate::core::error::{EngineError, EngineResult};
use crate::models::{GithubRepo, VersionRecord};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;

/// 版本源（按查询优先级排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionProvider {
    Npm,
    PyPi,
    Brew,
    Github,
}

impl VersionProvider {
    /// 查询顺序：越靠前越便宜、越不容易被限流
    pub const PRIORITY: [VersionProvider; 4] = [
        VersionProvider::Npm,
        VersionProvider::PyPi,
        VersionProvider::Brew,
        VersionProvider::Github,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VersionProvider::Npm => "npm",
            VersionProvider::PyPi => "pypi",
            VersionProvider::Brew => "brew",
            VersionProvider::Github => "github",
        }
    }
}

/// 版本源地址（测试时指向本地 mock 服务）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub npm: String,
    pub pypi: String,
    pub brew: String,
    pub github: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            npm: "https://registry.npmjs.org".to_string(),
            pypi: "https://pypi.org".to_string(),
            brew: "https://formulae.brew.sh".to_string(),
            github: "https://api.github.com".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// 所有版本源使用同一个基地址
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            npm: base.clone(),
            pypi: base.clone(),
            brew: base.clone(),
            github: base,
        }
    }
}

// ==================== 响应结构 ====================

#[derive(Debug, Deserialize)]
struct NpmPackument {
    #[serde(rename = "dist-tags")]
    dist_tags: NpmDistTags,
    #[serde(default)]
    versions: HashMap<String, NpmVersionMeta>,
    #[serde(default)]
    time: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct NpmDistTags {
    latest: String,
}

#[derive(Debug, Deserialize)]
struct NpmVersionMeta {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PypiProject {
    info: PypiInfo,
    #[serde(default)]
    releases: HashMap<String, Vec<PypiArtifact>>,
}

#[derive(Debug, Deserialize)]
struct PypiInfo {
    version: String,
}

#[derive(Debug, Deserialize)]
struct PypiArtifact {
    upload_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BrewFormula {
    versions: BrewVersions,
}

#[derive(Debug, Deserialize)]
struct BrewVersions {
    stable: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    published_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    browser_download_url: String,
}

#[derive(Debug, Deserialize)]
struct GithubTag {
    name: String,
}

// ==================== 查询 ====================

/// npm registry：dist-tags.latest + 对应发布时间 + 版本描述
pub async fn fetch_npm(client: &Client, base: &str, package: &str) -> EngineResult<VersionRecord> {
    let url = format!("{}/{}", base, encode_npm_package(package));
    let doc: NpmPackument = get_json(client, &url, VersionProvider::Npm, None).await?;

    let version = doc.dist_tags.latest;
    let published_at = doc
        .time
        .get(&version)
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    let changelog = doc
        .versions
        .get(&version)
        .and_then(|meta| meta.description.clone());

    Ok(VersionRecord {
        version,
        published_at,
        download_url: None,
        changelog,
    })
}

/// PyPI：info.version + 该版本最新制品的上传时间
pub async fn fetch_pypi(client: &Client, base: &str, package: &str) -> EngineResult<VersionRecord> {
    let url = format!("{}/pypi/{}/json", base, package);
    let doc: PypiProject = get_json(client, &url, VersionProvider::PyPi, None).await?;

    let version = doc.info.version;
    let published_at = doc
        .releases
        .get(&version)
        .into_iter()
        .flatten()
        .filter_map(|artifact| artifact.upload_time.as_deref())
        .filter_map(parse_pypi_time)
        .max()
        .unwrap_or_else(Utc::now);

    Ok(VersionRecord {
        version,
        published_at,
        download_url: None,
        changelog: None,
    })
}

/// Homebrew：versions.stable，没有可靠的发布时间，使用抓取时间
pub async fn fetch_brew(client: &Client, base: &str, formula: &str) -> EngineResult<VersionRecord> {
    let url = format!("{}/api/formula/{}.json", base, formula);
    let doc: BrewFormula = get_json(client, &url, VersionProvider::Brew, None).await?;

    let version = doc.versions.stable.ok_or_else(|| EngineError::ProviderUnavailable {
        provider: VersionProvider::Brew.name(),
        reason: format!("{formula} 没有 stable 版本"),
    })?;

    Ok(VersionRecord {
        version,
        published_at: Utc::now(),
        download_url: None,
        changelog: None,
    })
}

/// GitHub：最新 release，仓库没有 release 时退回最新 tag
pub async fn fetch_github(
    client: &Client,
    base: &str,
    repo: &GithubRepo,
    token: Option<&str>,
) -> EngineResult<VersionRecord> {
    let release_url = format!("{}/repos/{}/{}/releases/latest", base, repo.owner, repo.repo);
    match get_json::<GithubRelease>(client, &release_url, VersionProvider::Github, token).await {
        Ok(release) => Ok(VersionRecord {
            version: strip_v_prefix(&release.tag_name),
            published_at: release
                .published_at
                .or(release.created_at)
                .unwrap_or_else(Utc::now),
            download_url: release
                .assets
                .into_iter()
                .next()
                .map(|asset| asset.browser_download_url),
            changelog: release.body.filter(|body| !body.is_empty()),
        }),
        Err(e) => {
            tracing::debug!(
                repo = %format!("{}/{}", repo.owner, repo.repo),
                error = %e,
                "获取 release 失败，尝试 tags"
            );
            let tags_url = format!("{}/repos/{}/{}/tags?per_page=1", base, repo.owner, repo.repo);
            let tags: Vec<GithubTag> =
                get_json(client, &tags_url, VersionProvider::Github, token).await?;
            let tag = tags
                .into_iter()
                .next()
                .ok_or_else(|| EngineError::ProviderUnavailable {
                    provider: VersionProvider::Github.name(),
                    reason: format!("{}/{} 没有 release 也没有 tag", repo.owner, repo.repo),
                })?;
            Ok(VersionRecord {
                version: strip_v_prefix(&tag.name),
                published_at: Utc::now(),
                download_url: None,
                changelog: None,
            })
        }
    }
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    provider: VersionProvider,
    token: Option<&str>,
) -> EngineResult<T> {
    let unavailable = |reason: String| EngineError::ProviderUnavailable {
        provider: provider.name(),
        reason,
    };

    let mut request = client.get(url);
    request = match provider {
        VersionProvider::Github => request.header(ACCEPT, "application/vnd.github+json"),
        _ => request.header(ACCEPT, "application/json"),
    };
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            unavailable("请求超时".to_string())
        } else {
            unavailable(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(format!("HTTP {status}")));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| unavailable(format!("响应解析失败: {e}")))
}

/// scoped 包名需要转义斜杠（@scope/name → @scope%2Fname）
fn encode_npm_package(package: &str) -> String {
    package.replace('/', "%2F")
}

fn strip_v_prefix(tag: &str) -> String {
    tag.strip_prefix('v').unwrap_or(tag).to_string()
}

/// PyPI 的 upload_time 不带时区，按 UTC 处理
fn parse_pypi_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_helpers() {
        assert_eq!(encode_npm_package("@anthropic-ai/claude-code"), "@anthropic-ai%2Fclaude-code");
        assert_eq!(encode_npm_package("sample"), "sample");
        assert_eq!(strip_v_prefix("v1.2.3"), "1.2.3");
        assert_eq!(strip_v_prefix("1.2.3"), "1.2.3");

        let parsed = parse_pypi_time("2024-03-01T10:20:30").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T10:20:30+00:00");
        assert!(parse_pypi_time("not a date").is_none());
    }

    #[tokio::test]
    async fn test_npm_schema() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sample"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "dist-tags": { "latest": "1.1.0" },
                "versions": { "1.1.0": { "description": "A sample tool" } },
                "time": { "1.1.0": "2024-05-01T12:00:00.000Z" }
            })))
            .mount(&server)
            .await;

        let record = fetch_npm(&Client::new(), &server.uri(), "sample").await.unwrap();
        assert_eq!(record.version, "1.1.0");
        assert_eq!(record.changelog.as_deref(), Some("A sample tool"));
        assert_eq!(record.published_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[tokio::test]
    async fn test_pypi_uses_latest_artifact_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pypi/sample/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "info": { "version": "2.0.0" },
                "releases": {
                    "2.0.0": [
                        { "upload_time": "2024-01-01T00:00:00" },
                        { "upload_time": "2024-01-02T08:00:00" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let record = fetch_pypi(&Client::new(), &server.uri(), "sample").await.unwrap();
        assert_eq!(record.version, "2.0.0");
        assert_eq!(record.published_at.to_rfc3339(), "2024-01-02T08:00:00+00:00");
    }

    #[tokio::test]
    async fn test_brew_missing_stable_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/formula/sample.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "versions": { "stable": null }
            })))
            .mount(&server)
            .await;

        let err = fetch_brew(&Client::new(), &server.uri(), "sample").await.unwrap_err();
        assert!(matches!(err, EngineError::ProviderUnavailable { provider: "brew", .. }));
    }

    #[tokio::test]
    async fn test_github_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/sample/releases/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tag_name": "v3.1.0",
                "published_at": "2024-06-01T00:00:00Z",
                "body": "changes",
                "assets": [{ "browser_download_url": "https://example.com/sample.tar.gz" }]
            })))
            .mount(&server)
            .await;

        let repo = GithubRepo { owner: "acme".into(), repo: "sample".into() };
        let record = fetch_github(&Client::new(), &server.uri(), &repo, None).await.unwrap();
        assert_eq!(record.version, "3.1.0");
        assert_eq!(record.download_url.as_deref(), Some("https://example.com/sample.tar.gz"));
        assert_eq!(record.changelog.as_deref(), Some("changes"));
    }

    #[tokio::test]
    async fn test_github_falls_back_to_tags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/sample/releases/latest"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/sample/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "v0.9.0" }])))
            .expect(1)
            .mount(&server)
            .await;

        let repo = GithubRepo { owner: "acme".into(), repo: "sample".into() };
        let record = fetch_github(&Client::new(), &server.uri(), &repo, Some("token"))
            .await
            .unwrap();
        assert_eq!(record.version, "0.9.0");
        assert!(record.download_url.is_none());
    }

    #[tokio::test]
    async fn test_http_error_and_bad_body_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = Client::new();
        for package in ["missing", "garbled"] {
            let err = fetch_npm(&client, &server.uri(), package).await.unwrap_err();
            assert!(matches!(err, EngineError::ProviderUnavailable { provider: "npm", .. }));
        }
    }
}
