//! Guber 错误处理模块
//!
//! 每个变体对应一类可观测的失败。除启动阶段外，这些错误都在产生处记录日志并就地吞掉，
//! 不会中断调度器或进程。

use std::path::PathBuf;
use thiserror::Error;

/// 库内统一的结果类型
pub type Result<T> = std::result::Result<T, GuberError>;

/// Guber 统一错误类型
#[derive(Error, Debug)]
pub enum GuberError {
    /// 注册中心登录失败（续期时在下一个 tick 重试）
    #[error("registry login failed at {addr}: {reason}")]
    Auth { addr: String, reason: String },

    /// 查询实例列表失败（本轮跳过，下一轮重试）
    #[error("registry query for service {service} failed: {reason}")]
    RegistryQuery { service: String, reason: String },

    /// 注册中心没有返回可用实例，hosts 保持不变
    #[error("no usable instance for service {service} ({reported} reported by registry)")]
    EmptyResult { service: String, reported: usize },

    /// 与上一次观测结果完全一致
    #[error("instances of {hostname} unchanged")]
    NoChange { hostname: String },

    /// 写入 hosts 文件失败，内存状态已经前进
    #[error("failed to persist hosts file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 启动时备份 hosts 文件失败
    #[error("failed to back up hosts file to {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 退出时还原 hosts 文件失败
    #[error("failed to restore hosts file from {path}: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 启动时读取 hosts 文件失败
    #[error("failed to load hosts file {path}: {source}")]
    HostsLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置错误
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GuberError {
    /// 创建登录错误
    pub fn auth(addr: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        GuberError::Auth {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建查询错误
    pub fn registry_query(service: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        GuberError::RegistryQuery {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        GuberError::Config(msg.into())
    }

    /// 是否为预期内的良性结果（只有 "无变化" 属于此类）
    pub fn is_benign(&self) -> bool {
        matches!(self, GuberError::NoChange { .. })
    }
}
