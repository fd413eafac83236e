//! hosts 同步器

use tracing::{debug, error, info};

use super::HostsFile;
use crate::error::{GuberError, Result};

/// 以整组替换的方式更新某个主机名的映射并持久化
///
/// 写盘失败时内存状态不回滚，同步器标记为 dirty，之后由 `flush_if_dirty` 重试。
pub struct HostSynchronizer {
    hosts: HostsFile,
    dirty: bool,
}

impl HostSynchronizer {
    pub fn new(hosts: HostsFile) -> Self {
        Self {
            hosts,
            dirty: false,
        }
    }

    pub fn hosts(&self) -> &HostsFile {
        &self.hosts
    }

    /// 内存与磁盘是否不一致
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub async fn apply(&mut self, hostname: &str, ips: &[String]) -> Result<()> {
        info!(host = %hostname, ips = ?ips, "update hosts");
        let removed = self.hosts.remove_host(hostname);
        debug!(host = %hostname, removed, "removed previous mappings");
        for ip in ips {
            debug!(host = %hostname, ip = %ip, "add host");
            self.hosts.add_host(ip, hostname);
        }
        self.persist().await
    }

    /// 上次写盘失败时重新写入当前状态
    pub async fn flush_if_dirty(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        debug!(path = %self.hosts.path().display(), "retrying hosts persist");
        self.persist().await
    }

    async fn persist(&mut self) -> Result<()> {
        match self.hosts.save().await {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(source) => {
                self.dirty = true;
                error!(
                    path = %self.hosts.path().display(),
                    error = %source,
                    "failed to save hosts, in-memory table is ahead of the file"
                );
                Err(GuberError::Persist {
                    path: self.hosts.path().to_path_buf(),
                    source,
                })
            }
        }
    }
}
