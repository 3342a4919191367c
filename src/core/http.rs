use crate::core::error::{EngineError, EngineResult};
use crate::models::config::ProxySettings;
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("actm/", env!("CARGO_PKG_VERSION"));

/// 版本源请求超时
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// 构建带代理配置的 HTTP 客户端
///
/// # 参数
/// - `proxy`: 可选的代理设置（来自全局配置）
///
/// # 返回
/// - 配置好的 reqwest::Client（10 秒超时）
pub fn build_http_client(proxy: Option<&ProxySettings>) -> EngineResult<Client> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(PROVIDER_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10));

    if let Some(settings) = proxy {
        let proxy_url = build_proxy_url(settings);
        let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
            EngineError::InvalidInput(format!("代理 URL 无效: {proxy_url}: {e}"))
        })?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

/// 构建代理 URL
fn build_proxy_url(settings: &ProxySettings) -> String {
    format!(
        "{}://{}:{}",
        settings.protocol.scheme(),
        settings.host,
        settings.port
    )
}
