//! 服务轮询与变更检测
//!
//! 每个环境一个 `ServicePoller`，同一环境下的所有服务共享一个缓存。

pub mod cache;
pub mod filter;

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{GuberError, Result};
use crate::registry::RegistryBackend;

pub use cache::{CacheKey, ChangeCache};
pub use filter::KeepRules;

/// 一次需要应用到 hosts 的变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostUpdate {
    pub hostname: String,
    pub ips: Vec<String>,
}

/// 单个环境的服务轮询器
pub struct ServicePoller {
    backend: Arc<dyn RegistryBackend>,
    environment: String,
    keep: KeepRules,
    cache: ChangeCache,
}

impl ServicePoller {
    pub fn new(
        backend: Arc<dyn RegistryBackend>,
        environment: impl Into<String>,
        keep: KeepRules,
    ) -> Self {
        Self {
            backend,
            environment: environment.into(),
            keep,
            cache: ChangeCache::new(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    /// 查询服务实例并判断是否需要更新 hosts
    ///
    /// # 返回
    /// * `Ok(HostUpdate)` - IP 列表发生变化（缓存已更新）
    /// * `Err(RegistryQuery)` - 查询失败
    /// * `Err(EmptyResult)` - 没有实例，或过滤后为空（缓存不变）
    /// * `Err(NoChange)` - 与上次结果逐项一致（缓存不变）
    pub async fn poll(&mut self, service: &str) -> Result<HostUpdate> {
        let instances = self.backend.list_instances(service).await?;
        let reported = instances.len();
        if reported == 0 {
            return Err(GuberError::EmptyResult {
                service: service.to_string(),
                reported,
            });
        }

        let ips: Vec<String> = instances
            .into_iter()
            .filter(|instance| self.keep.retains(instance))
            .filter_map(|instance| match instance.ip.parse::<IpAddr>() {
                Ok(_) => Some(instance.ip),
                Err(_) => {
                    warn!(service = %service, ip = %instance.ip, "skipping instance with invalid ip");
                    None
                }
            })
            .collect();

        if ips.is_empty() {
            debug!(service = %service, reported, "no instance passed health and keep filters");
            return Err(GuberError::EmptyResult {
                service: service.to_string(),
                reported,
            });
        }

        let key = CacheKey::new(service, self.environment.as_str());
        let hostname = key.hostname();
        if self.cache.is_unchanged(&key, &ips) {
            return Err(GuberError::NoChange { hostname });
        }

        self.cache.record(key, ips.clone());
        info!(
            hostname = %hostname,
            ips = ?ips,
            addr = %self.backend.endpoint(),
            "nacos get service success"
        );
        Ok(HostUpdate { hostname, ips })
    }
}
