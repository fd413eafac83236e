//! 集成测试共用的假注册中心

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use guber::{GuberError, InstanceRecord, RegistryBackend, Result};

/// 按服务名排队返回预设结果的后端，队列耗尽后返回查询错误
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<HashMap<String, VecDeque<Result<Vec<InstanceRecord>>>>>,
}

impl ScriptedBackend {
    pub fn push(&self, service: &str, response: Result<Vec<InstanceRecord>>) {
        self.responses
            .lock()
            .unwrap()
            .entry(service.to_string())
            .or_default()
            .push_back(response);
    }

    #[allow(dead_code)]
    pub fn push_ips(&self, service: &str, ips: &[&str]) {
        self.push(
            service,
            Ok(ips.iter().map(|ip| InstanceRecord::new(*ip, 8080)).collect()),
        );
    }
}

#[async_trait]
impl RegistryBackend for ScriptedBackend {
    fn endpoint(&self) -> &str {
        "http://scripted:8848"
    }

    async fn list_instances(&self, service: &str) -> Result<Vec<InstanceRecord>> {
        self.responses
            .lock()
            .unwrap()
            .get_mut(service)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(GuberError::registry_query(service, "no scripted response")))
    }
}

/// 每次查询前先等待固定时长
#[allow(dead_code)]
pub struct SlowBackend {
    inner: ScriptedBackend,
    delay: Duration,
}

#[allow(dead_code)]
impl SlowBackend {
    pub fn new(inner: ScriptedBackend, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl RegistryBackend for SlowBackend {
    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    async fn list_instances(&self, service: &str) -> Result<Vec<InstanceRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_instances(service).await
    }
}
