//! 注册中心抽象和 Nacos 实现

pub mod model;
pub mod session;

use async_trait::async_trait;

use crate::error::Result;

pub use model::{InstanceRecord, LoginResponse, ServiceInstances};
pub use session::{AccessToken, NacosSession};

/// 注册中心后端 trait
///
/// 轮询器只依赖这个 trait；需要动态分发，所以使用 async-trait
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// 注册中心地址（用于日志）
    fn endpoint(&self) -> &str;

    /// 查询服务的全部实例（不做健康过滤）
    ///
    /// # 错误
    /// * `RegistryQuery` - 网络错误、非 200 状态码或响应无法解析
    async fn list_instances(&self, service: &str) -> Result<Vec<InstanceRecord>>;
}
