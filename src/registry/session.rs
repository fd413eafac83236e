//! Nacos 会话：登录、token 保存和定时续期

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, StatusCode};
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use super::RegistryBackend;
use super::model::{InstanceRecord, LoginResponse, ServiceInstances};
use crate::config::RegistryEndpoint;
use crate::error::{GuberError, Result};
use crate::shutdown::CloseSignal;

/// 一次成功登录的不可变快照
///
/// 续期时整体替换，读者不会看到 token 与另一次登录的 ttl 混在一起。
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    /// 注册中心返回的有效期（秒）
    pub ttl_secs: i64,
    pub obtained_at: DateTime<Utc>,
    pub global_admin: bool,
}

impl AccessToken {
    /// `now - obtained_at >= ttl` 时视为过期
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        (now - self.obtained_at).num_seconds() >= self.ttl_secs
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.obtained_at + chrono::TimeDelta::try_seconds(self.ttl_secs).unwrap_or_default()
    }
}

/// 与单个 Nacos 地址的认证会话
pub struct NacosSession {
    endpoint: RegistryEndpoint,
    http_client: HttpClient,
    token: RwLock<Option<Arc<AccessToken>>>,
}

impl NacosSession {
    /// 创建会话，不登录
    pub fn new(endpoint: RegistryEndpoint, request_timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| GuberError::auth(endpoint.addr.clone(), e))?;
        Ok(Self {
            endpoint,
            http_client,
            token: RwLock::new(None),
        })
    }

    fn api_url(&self, path: &str) -> String {
        let addr = self.endpoint.addr.trim_end_matches('/');
        match self.endpoint.api_prefix.trim_matches('/') {
            "" => format!("{}/{}", addr, path),
            prefix => format!("{}/{}/{}", addr, prefix, path),
        }
    }

    /// 提交用户名密码并保存返回的 token
    ///
    /// 失败时保留之前的 token
    pub async fn login(&self) -> Result<()> {
        let addr = self.endpoint.addr.as_str();
        let params = [
            ("username", self.endpoint.username.as_str()),
            ("password", self.endpoint.password.as_str()),
        ];

        let resp = self
            .http_client
            .post(self.api_url("auth/login"))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(addr = %addr, error = %e, "nacos login failed");
                GuberError::auth(addr, e)
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            error!(addr = %addr, status = status.as_u16(), "nacos login returned non-200 status");
            return Err(GuberError::auth(addr, format!("unexpected status {}", status)));
        }

        let body = resp.text().await.map_err(|e| {
            error!(addr = %addr, error = %e, "nacos login response read failed");
            GuberError::auth(addr, e)
        })?;
        let login: LoginResponse = serde_json::from_str(&body).map_err(|e| {
            error!(addr = %addr, error = %e, "nacos login response is not valid json");
            GuberError::auth(addr, e)
        })?;

        let token = AccessToken {
            value: login.access_token,
            ttl_secs: login.token_ttl,
            obtained_at: Utc::now(),
            global_admin: login.global_admin,
        };
        info!(
            addr = %addr,
            ttl_secs = token.ttl_secs,
            global_admin = token.global_admin,
            expires_at = %token.expires_at(),
            "nacos login succeeded"
        );
        *self.token.write().await = Some(Arc::new(token));
        Ok(())
    }

    /// 当前 token，从未登录成功时为 None
    pub async fn token(&self) -> Option<Arc<AccessToken>> {
        self.token.read().await.clone()
    }

    pub async fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        match self.token.read().await.as_ref() {
            Some(token) => token.is_expired_at(now),
            None => true,
        }
    }

    /// token 过期时重新登录，返回是否发起了登录
    pub async fn renew_if_expired(&self) -> Result<bool> {
        if !self.needs_renewal(Utc::now()).await {
            debug!(addr = %self.endpoint.addr, "access token still valid");
            return Ok(false);
        }
        self.login().await?;
        Ok(true)
    }

    /// 续期循环，每 `every` 检查一次，直到收到关闭信号
    pub async fn run_renewal(self: Arc<Self>, every: Duration, signal: CloseSignal) {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = signal.closed() => break,
                _ = ticker.tick() => {
                    info!(addr = %self.endpoint.addr, "refresh nacos access token");
                    if let Err(e) = self.renew_if_expired().await {
                        warn!(addr = %self.endpoint.addr, error = %e, "token renewal failed, retrying on next tick");
                    }
                }
            }
        }
        info!(addr = %self.endpoint.addr, "token renewal stopped");
    }
}

#[async_trait]
impl RegistryBackend for NacosSession {
    fn endpoint(&self) -> &str {
        &self.endpoint.addr
    }

    async fn list_instances(&self, service: &str) -> Result<Vec<InstanceRecord>> {
        let token = self
            .token()
            .await
            .map(|t| t.value.clone())
            .unwrap_or_default();

        let resp = self
            .http_client
            .get(self.api_url("ns/instance/list"))
            .query(&[("accessToken", token.as_str()), ("serviceName", service)])
            .send()
            .await
            .map_err(|e| {
                error!(service = %service, error = %e, "nacos get service failed");
                GuberError::registry_query(service, e)
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            error!(service = %service, status = status.as_u16(), "nacos get service returned non-200 status");
            return Err(GuberError::registry_query(
                service,
                format!("unexpected status {}", status),
            ));
        }

        let body = resp.text().await.map_err(|e| {
            error!(service = %service, error = %e, "nacos get service response read failed");
            GuberError::registry_query(service, e)
        })?;
        let instances: ServiceInstances = serde_json::from_str(&body).map_err(|e| {
            error!(service = %service, error = %e, "nacos get service response is not valid json");
            GuberError::registry_query(service, e)
        })?;

        debug!(service = %service, count = instances.hosts.len(), "nacos instances fetched");
        Ok(instances.hosts)
    }
}
