//! 版本号比较与提取
//!
//! `is_newer` 先按语义化版本严格比较；任一侧无法解析时退化为按字节的字符串比较。
//! 这种退化是已知限制：例如 "10.0" 与 "9.0" 都不是合法 semver，字符串比较会得出 "10.0" < "9.0"。

use once_cell::sync::Lazy;
use regex::Regex;
use semver::{Prerelease, Version};

static TRIPLET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+\.\d+)").expect("invalid version regex"));

/// `latest` 是否严格新于 `current`
pub fn is_newer(current: &str, latest: &str) -> bool {
    match (Version::parse(current), Version::parse(latest)) {
        (Ok(current), Ok(latest)) => precedence(&latest) > precedence(&current),
        _ => latest > current,
    }
}

/// semver 优先级比较键：build 元数据不参与排序，无预发布标记的版本高于同号预发布版本
fn precedence(version: &Version) -> (u64, u64, u64, &Prerelease) {
    (version.major, version.minor, version.patch, &version.pre)
}

/// 是否过期：当前版本与最新版本都存在且最新版本严格更新
pub fn is_outdated(current: Option<&str>, latest: Option<&str>) -> bool {
    match (current, latest) {
        (Some(current), Some(latest)) => is_newer(current, latest),
        _ => false,
    }
}

/// 用通用的 x.y.z 模式提取版本号（更新后校验使用，不依赖工具自定义正则）
pub fn extract_version(output: &str) -> Option<String> {
    TRIPLET_REGEX
        .captures(output)?
        .get(1)
        .map(|m| m.as_str().to_string())
}
