//! hosts 备份与还原

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{GuberError, Result};

/// 启动时快照 hosts 文件，退出时还原并删除快照
pub struct BackupManager {
    primary: PathBuf,
    backup: PathBuf,
    snapshot_taken: bool,
}

/// `<primary>.bak`
pub fn backup_path_for(primary: &Path) -> PathBuf {
    let mut name = OsString::from(primary.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

impl BackupManager {
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        let primary = primary.into();
        let backup = backup_path_for(&primary);
        Self {
            primary,
            backup,
            snapshot_taken: false,
        }
    }

    pub fn primary_path(&self) -> &Path {
        &self.primary
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot_taken
    }

    /// 复制当前 hosts 文件到备份路径
    ///
    /// 失败不致命，由调用方记录告警后继续启动
    pub async fn snapshot(&mut self) -> Result<()> {
        if tokio::fs::try_exists(&self.backup).await.unwrap_or(false) {
            warn!(path = %self.backup.display(), "stale hosts backup found, overwriting");
        }
        tokio::fs::copy(&self.primary, &self.backup)
            .await
            .map_err(|source| GuberError::Backup {
                path: self.backup.clone(),
                source,
            })?;
        self.snapshot_taken = true;
        info!(
            read = %self.primary.display(),
            write = %self.backup.display(),
            "hosts backup created"
        );
        Ok(())
    }

    /// 还原快照：读取备份、写回 hosts、删除备份
    ///
    /// 尽力而为：任一步骤失败都只记录日志并终止，不向调用方返回错误
    pub async fn restore(&mut self) {
        if !self.snapshot_taken {
            warn!(path = %self.primary.display(), "no hosts backup was taken, skipping restore");
            return;
        }

        let content = match tokio::fs::read(&self.backup).await {
            Ok(content) => content,
            Err(source) => {
                let err = GuberError::Restore {
                    path: self.backup.clone(),
                    source,
                };
                error!(error = %err, "failed to read from backup hosts");
                return;
            }
        };

        debug!(read = %self.backup.display(), write = %self.primary.display(), "restore hosts");
        if let Err(source) = tokio::fs::write(&self.primary, content).await {
            let err = GuberError::Restore {
                path: self.backup.clone(),
                source,
            };
            error!(write = %self.primary.display(), error = %err, "failed to restore hosts");
            return;
        }

        debug!(path = %self.backup.display(), "delete");
        if let Err(e) = tokio::fs::remove_file(&self.backup).await {
            error!(path = %self.backup.display(), error = %e, "failed to remove backup hosts");
            return;
        }
        self.snapshot_taken = false;
        info!(path = %self.primary.display(), "hosts restored");
    }
}
