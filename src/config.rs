//! 配置模块
//!
//! 支持 YAML（`.yaml`/`.yml`）和 TOML（`.toml`）两种格式，按扩展名选择解析器。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GuberError, Result};

/// 未指定配置文件时依次查找的文件名
pub const DEFAULT_CONFIG_FILES: &[&str] = &["config.yaml", "config.yml", "config.toml"];

/// 各定时器间隔的上限（秒），30 天
pub const MAX_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// 每个环境一项
    #[serde(rename = "service")]
    pub apps: Vec<AppConfig>,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub hosts: HostsConfig,
}

/// 一个环境：一组服务名 + 一个注册中心
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub names: Vec<String>,
    pub env: String,
    pub nacos: RegistryEndpoint,
    #[serde(default)]
    pub keep: Vec<KeepFilter>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryEndpoint {
    pub addr: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// 元数据保留规则，`value` 为空表示只要求 key 存在
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KeepFilter {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 定时器配置（单位：秒）
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    #[serde(default = "default_token_refresh_interval")]
    pub token_refresh_interval: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostsConfig {
    /// 为空时使用平台默认的 hosts 文件
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_api_prefix() -> String {
    "/nacos/v1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_token_refresh_interval() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            token_refresh_interval: default_token_refresh_interval(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn token_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.token_refresh_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl HostsConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(crate::hosts::default_hosts_path)
    }
}

impl Config {
    /// 从文件加载并校验配置
    ///
    /// 返回配置以及实际使用的文件路径
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => DEFAULT_CONFIG_FILES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
                .ok_or_else(|| {
                    GuberError::config(format!(
                        "no config file given and none of {:?} found in the working directory",
                        DEFAULT_CONFIG_FILES
                    ))
                })?,
        };
        let config = Self::load_from_file(&path)?;
        Ok((config, path))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuberError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| GuberError::config(format!("failed to parse yaml config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| GuberError::config(format!("failed to parse toml config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.apps.is_empty() {
            return Err(GuberError::config("at least one `service` entry is required"));
        }
        for (key, secs) in [
            ("poll_interval", self.watch.poll_interval),
            ("token_refresh_interval", self.watch.token_refresh_interval),
            ("request_timeout", self.watch.request_timeout),
        ] {
            if secs == 0 || secs > MAX_INTERVAL_SECS {
                return Err(GuberError::config(format!(
                    "watch.{} must be between 1 and {} seconds, got {}",
                    key, MAX_INTERVAL_SECS, secs
                )));
            }
        }

        let mut seen = HashSet::new();
        for app in &self.apps {
            if !is_hostname_label(&app.env) {
                return Err(GuberError::config(format!(
                    "env {:?} must be a non-empty hostname token ([A-Za-z0-9._-])",
                    app.env
                )));
            }
            let addr = app.nacos.addr.trim();
            if !(addr.starts_with("http://") || addr.starts_with("https://")) {
                return Err(GuberError::config(format!(
                    "nacos addr {:?} of env {} must start with http:// or https://",
                    app.nacos.addr, app.env
                )));
            }
            if app.names.is_empty() {
                return Err(GuberError::config(format!(
                    "env {} does not track any service",
                    app.env
                )));
            }
            for name in &app.names {
                if !is_hostname_label(name) {
                    return Err(GuberError::config(format!(
                        "service name {:?} in env {} must be a non-empty hostname token ([A-Za-z0-9._-])",
                        name, app.env
                    )));
                }
                if !seen.insert(format!("{}.{}", name, app.env)) {
                    return Err(GuberError::config(format!(
                        "service {} is tracked twice in env {}",
                        name, app.env
                    )));
                }
            }
            if app.keep.iter().any(|k| k.key.is_empty()) {
                return Err(GuberError::config(format!(
                    "env {} has a keep filter with an empty key",
                    app.env
                )));
            }
        }
        Ok(())
    }
}

/// `<name>.<env>` 会作为单个主机名写入 hosts，两部分都只能包含 `[A-Za-z0-9._-]`
fn is_hostname_label(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
