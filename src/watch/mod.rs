//! 定时轮询调度器
//!
//! 单个定时器驱动所有环境：每个 tick 按配置顺序串行轮询每个环境下的每个服务，
//! 有变化的结果交给 `HostSynchronizer`。单个服务的失败只记录日志，不影响本轮其余服务。

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::hosts::HostSynchronizer;
use crate::poller::ServicePoller;
use crate::shutdown::CloseSignal;

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// 首个 tick 之前，或两次 sweep 之间
    Idle,
    /// 正在执行一次 sweep
    Polling,
    /// 收到关闭信号后定时器已停止
    Stopped,
}

/// 一个环境及其需要跟踪的服务
pub struct EnvironmentWatch {
    pub services: Vec<String>,
    pub poller: ServicePoller,
}

impl EnvironmentWatch {
    pub fn new(poller: ServicePoller, services: Vec<String>) -> Self {
        Self { services, poller }
    }
}

/// 一次 sweep 的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub applied: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub persist_failures: usize,
}

pub struct WatchScheduler {
    watches: Vec<EnvironmentWatch>,
    synchronizer: HostSynchronizer,
    interval: Duration,
    state: WatchState,
    sweeps: u64,
}

impl WatchScheduler {
    pub fn new(
        watches: Vec<EnvironmentWatch>,
        synchronizer: HostSynchronizer,
        interval: Duration,
    ) -> Self {
        Self {
            watches,
            synchronizer,
            interval,
            state: WatchState::Idle,
            sweeps: 0,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn synchronizer(&self) -> &HostSynchronizer {
        &self.synchronizer
    }

    /// 已完成的 sweep 次数
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// 执行一次完整 sweep
    pub async fn sweep(&mut self) -> SweepReport {
        let mut report = SweepReport::default();

        for watch in self.watches.iter_mut() {
            for service in &watch.services {
                match watch.poller.poll(service).await {
                    Ok(update) => {
                        match self.synchronizer.apply(&update.hostname, &update.ips).await {
                            Ok(()) => report.applied += 1,
                            Err(_) => report.persist_failures += 1,
                        }
                    }
                    Err(e) if e.is_benign() => {
                        debug!(service = %service, env = %watch.poller.environment(), "{}", e);
                        report.unchanged += 1;
                    }
                    Err(e) => {
                        warn!(service = %service, env = %watch.poller.environment(), error = %e, "poll skipped");
                        report.skipped += 1;
                    }
                }
            }
        }

        if report.applied == 0 && self.synchronizer.flush_if_dirty().await.is_err() {
            report.persist_failures += 1;
        }

        self.sweeps += 1;
        report
    }

    /// 运行直到收到关闭信号
    ///
    /// 关闭信号只在两次 sweep 之间被检查，进行中的 sweep 会完整执行。
    pub async fn run(&mut self, signal: CloseSignal) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, environments = self.watches.len(), "watch scheduler started");

        loop {
            tokio::select! {
                biased;
                _ = signal.closed() => break,
                _ = ticker.tick() => {
                    self.state = WatchState::Polling;
                    let report = self.sweep().await;
                    debug!(?report, "sweep finished");
                    self.state = WatchState::Idle;
                }
            }
        }

        self.state = WatchState::Stopped;
        info!(sweeps = self.sweeps, "watch scheduler stopped");
    }
}
