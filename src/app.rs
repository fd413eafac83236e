//! Guber 运行时装配
//!
//! 启动顺序：
//! 1. 为每个环境创建会话并登录（失败即启动失败）
//! 2. 读取 hosts 文件（失败即启动失败）并做快照
//! 3. 挂载 token 续期任务、调度任务，最后挂载还原任务
//!
//! 还原任务会等调度任务停止后才写 hosts，因此两者不会同时修改文件。

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::{AppConfig, Config};
use crate::error::{GuberError, Result};
use crate::hosts::{BackupManager, HostSynchronizer, HostsFile};
use crate::poller::{KeepRules, ServicePoller};
use crate::registry::NacosSession;
use crate::shutdown::{CloseError, SafeClose};
use crate::watch::{EnvironmentWatch, WatchScheduler};

pub struct Guber {
    safe_close: SafeClose,
}

impl Guber {
    /// 完成启动并在后台运行，返回后可以通过 `wait_closed` 等待退出
    pub async fn start(config: &Config) -> Result<Self> {
        let mut sessions = Vec::with_capacity(config.apps.len());
        for app in &config.apps {
            let session = NacosSession::new(app.nacos.clone(), config.watch.request_timeout())?;
            session.login().await?;
            sessions.push(Arc::new(session));
        }

        let hosts_path = config.hosts.resolved_path();
        let hosts = HostsFile::load(&hosts_path)
            .await
            .map_err(|source| GuberError::HostsLoad {
                path: hosts_path.clone(),
                source,
            })?;

        let mut backup = BackupManager::new(&hosts_path);
        if let Err(e) = backup.snapshot().await {
            warn!(error = %e, "failed to backup hosts, running without a restore point");
        }

        let watches = config
            .apps
            .iter()
            .zip(&sessions)
            .map(|(app, session)| EnvironmentWatch::new(new_poller(app, session.clone()), app.names.clone()))
            .collect();
        let mut scheduler = WatchScheduler::new(
            watches,
            HostSynchronizer::new(hosts),
            config.watch.poll_interval(),
        );

        let safe_close = SafeClose::new();

        let refresh_every = config.watch.token_refresh_interval();
        for session in sessions {
            safe_close.attach(move |done, signal| async move {
                session.run_renewal(refresh_every, signal).await;
                done.done();
            });
        }

        let (stopped_tx, stopped_rx) = oneshot::channel::<()>();
        safe_close.attach(move |done, signal| async move {
            scheduler.run(signal).await;
            let _ = stopped_tx.send(());
            done.done();
        });

        safe_close.attach(move |done, signal| async move {
            signal.closed().await;
            // 调度任务异常退出时 sender 被丢弃，同样继续还原
            let _ = stopped_rx.await;
            backup.restore().await;
            done.done();
        });

        info!(environments = config.apps.len(), "all nacos clients are loaded");
        Ok(Self { safe_close })
    }

    pub fn safe_close(&self) -> &SafeClose {
        &self.safe_close
    }

    /// `send_close_signal` 的快捷方式
    pub fn close_with_err(&self, err: Option<anyhow::Error>) {
        self.safe_close.send_close_signal(err);
    }

    pub async fn wait_closed(&self) -> std::result::Result<(), CloseError> {
        self.safe_close.wait_closed().await
    }

    /// 试运行：登录每个注册中心并对每个服务轮询一次，不修改 hosts
    pub async fn status(config: &Config) -> String {
        let mut output = String::new();
        for app in &config.apps {
            let session = match NacosSession::new(app.nacos.clone(), config.watch.request_timeout()) {
                Ok(session) => session,
                Err(_) => {
                    output.push_str(&format!("nacos: {},error\n", app.nacos.addr));
                    continue;
                }
            };
            match session.login().await {
                Ok(()) => output.push_str(&format!("nacos: {}\n", app.nacos.addr)),
                Err(_) => output.push_str(&format!("nacos: {},error\n", app.nacos.addr)),
            }

            let mut poller = new_poller(app, Arc::new(session));
            for name in &app.names {
                match poller.poll(name).await {
                    Ok(update) => {
                        output.push_str(&format!("  {}: [{}]\n", name, update.ips.join(", ")))
                    }
                    Err(_) => output.push_str(&format!("  {}: error\n", name)),
                }
            }
        }
        output
    }
}

fn new_poller(app: &AppConfig, session: Arc<NacosSession>) -> ServicePoller {
    ServicePoller::new(session, app.env.clone(), KeepRules::new(app.keep.clone()))
}
