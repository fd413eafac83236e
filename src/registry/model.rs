//! Nacos 开放接口的数据结构

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `POST /auth/login` 的响应
///
/// `{"accessToken":"eyJhbGciOiJIUzI1NiJ9...","tokenTtl":18000,"globalAdmin":true}`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_ttl: i64,
    #[serde(default)]
    pub global_admin: bool,
}

/// `GET /ns/instance/list` 的响应，只保留用到的字段
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceInstances {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<InstanceRecord>,
}

/// 服务实例，只在一次查询内有效
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstanceRecord {
    pub ip: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub healthy: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InstanceRecord {
    pub fn new(ip: impl Into<String>, port: i32) -> Self {
        Self {
            ip: ip.into(),
            port,
            healthy: true,
            metadata: HashMap::new(),
        }
    }

    /// 设置健康状态
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
