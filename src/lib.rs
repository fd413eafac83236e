//! Guber
//!
//! 根据 Nacos 中健康的服务实例维护本地 hosts 映射：
//! 登录注册中心、定时轮询每个环境下的服务、在实例变化时整组替换 `<service>.<env>` 的映射，
//! 退出时把 hosts 文件还原为启动前的内容。

pub mod app;
pub mod config;
pub mod error;
pub mod hosts;
pub mod logging;
pub mod poller;
pub mod registry;
pub mod shutdown;
pub mod watch;

// Re-exports
pub use app::Guber;
pub use config::{AppConfig, Config, KeepFilter, LogConfig, RegistryEndpoint, WatchConfig};
pub use error::{GuberError, Result};
pub use hosts::{BackupManager, HostSynchronizer, HostsFile};
pub use poller::{CacheKey, ChangeCache, HostUpdate, KeepRules, ServicePoller};
pub use registry::{AccessToken, InstanceRecord, NacosSession, RegistryBackend};
pub use shutdown::{CloseError, CloseSignal, Done, SafeClose};
pub use watch::{EnvironmentWatch, SweepReport, WatchScheduler, WatchState};
