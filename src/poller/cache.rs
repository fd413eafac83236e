//! 变更检测缓存

use std::collections::HashMap;
use std::fmt;

/// (服务, 环境) 组合键，`Display` 结果同时是 hosts 中使用的主机名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub service: String,
    pub environment: String,
}

impl CacheKey {
    pub fn new(service: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            environment: environment.into(),
        }
    }

    pub fn hostname(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service, self.environment)
    }
}

/// 记录每个键最近一次发布的 IP 列表，仅存在于进程内
#[derive(Debug, Default)]
pub struct ChangeCache {
    entries: HashMap<CacheKey, Vec<String>>,
}

impl ChangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&[String]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    /// 与上次记录逐项比较（顺序敏感）
    pub fn is_unchanged(&self, key: &CacheKey, ips: &[String]) -> bool {
        self.entries
            .get(key)
            .map(|prev| prev.as_slice() == ips)
            .unwrap_or(false)
    }

    pub fn record(&mut self, key: CacheKey, ips: Vec<String>) {
        self.entries.insert(key, ips);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
