//! 最新版本缓存
//!
//! 按工具名缓存版本源的解析结果：
//! - TTL 过期：条目仅在 `now - fetched_at < ttl` 时有效，过期条目在读取时删除，绝不返回陈旧数据
//! - 各工具条目互不影响：写入一个工具不会淘汰其他工具仍然有效的条目
//! - 只缓存成功结果，未命中或全部版本源失败都不写入
//!
//! 条目按抓取时间排列，写入时从队首清理已过期的条目，内存占用随目录大小而非运行时长增长。

use crate::models::VersionRecord;
use chrono::{DateTime, Duration, Utc};
use linked_hash_map::LinkedHashMap;

/// 缓存有效期（24 小时）
pub const VERSION_CACHE_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: VersionRecord,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

/// 版本缓存
#[derive(Debug)]
pub struct VersionCache {
    entries: LinkedHashMap<String, CacheEntry>,
    ttl: Duration,
}

impl VersionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: LinkedHashMap::new(),
            ttl,
        }
    }

    /// 获取未过期的缓存记录
    pub fn get(&mut self, tool: &str) -> Option<VersionRecord> {
        self.get_at(tool, Utc::now())
    }

    /// 以指定时刻判断有效性
    pub fn get_at(&mut self, tool: &str, now: DateTime<Utc>) -> Option<VersionRecord> {
        let valid = self.entries.get(tool)?.is_valid_at(now, self.ttl);
        if !valid {
            self.entries.remove(tool);
            return None;
        }
        self.entries.get(tool).map(|entry| entry.record.clone())
    }

    /// 写入缓存，抓取时间为当前时刻
    pub fn insert(&mut self, tool: &str, record: VersionRecord) {
        self.insert_at(tool, record, Utc::now());
    }

    pub fn insert_at(&mut self, tool: &str, record: VersionRecord, fetched_at: DateTime<Utc>) {
        self.entries.remove(tool);
        self.purge_expired(fetched_at);
        self.entries
            .insert(tool.to_string(), CacheEntry { record, fetched_at });
    }

    /// 从队首移除在 `now` 时已过期的条目
    fn purge_expired(&mut self, now: DateTime<Utc>) {
        while let Some((_, entry)) = self.entries.front() {
            if entry.is_valid_at(now, self.ttl) {
                break;
            }
            self.entries.pop_front();
        }
    }

    /// 无条件清空
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VersionCache {
    fn default() -> Self {
        Self::new(Duration::hours(VERSION_CACHE_TTL_HOURS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(version: &str) -> VersionRecord {
        VersionRecord {
            version: version.to_string(),
            published_at: Utc::now(),
            download_url: None,
            changelog: Some("notes".to_string()),
        }
    }

    #[test]
    fn test_hit_returns_identical_record() {
        let mut cache = VersionCache::default();
        let original = record("1.1.0");
        cache.insert("sample", original.clone());
        assert_eq!(cache.get("sample"), Some(original));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let mut cache = VersionCache::default();
        let fetched = Utc::now();
        cache.insert_at("sample", record("1.1.0"), fetched);

        let just_before = fetched + Duration::hours(24) - Duration::seconds(1);
        assert!(cache.get_at("sample", just_before).is_some());

        // 恰好满 TTL 即视为过期
        let at_ttl = fetched + Duration::hours(24);
        assert!(cache.get_at("sample", at_ttl).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_expire_independently() {
        let mut cache = VersionCache::default();
        let now = Utc::now();
        cache.insert_at("old", record("1.0.0"), now - Duration::hours(25));
        cache.insert_at("fresh", record("2.0.0"), now);

        assert!(cache.get_at("old", now).is_none());
        assert_eq!(cache.get_at("fresh", now).unwrap().version, "2.0.0");
    }

    #[test]
    fn test_insert_never_evicts_other_valid_entries() {
        let mut cache = VersionCache::default();
        for i in 0..200 {
            cache.insert(&format!("tool-{i}"), record("1.0.0"));
        }
        assert_eq!(cache.len(), 200);
        assert_eq!(cache.get("tool-0").unwrap().version, "1.0.0");
    }

    #[test]
    fn test_insert_purges_only_expired_entries() {
        let mut cache = VersionCache::default();
        let now = Utc::now();
        cache.insert_at("stale", record("1.0.0"), now - Duration::hours(30));
        cache.insert_at("recent", record("1.0.0"), now - Duration::hours(1));
        cache.insert_at("new", record("2.0.0"), now);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("recent", now).is_some());
        assert!(cache.get_at("new", now).is_some());
    }

    #[test]
    fn test_clear() {
        let mut cache = VersionCache::default();
        cache.insert("a", record("1.0.0"));
        cache.insert("b", record("1.0.0"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
