//! 进程级关闭协调
//!
//! `SafeClose` 把一次性的关闭广播、完成屏障和首个错误保存组合在一起：
//!
//! 1. `attach` 注册一个清理任务，任务拿到 [`Done`] 句柄和 [`CloseSignal`]
//! 2. `send_close_signal` 只有第一次调用生效，携带的错误会被保留
//! 3. `wait_closed` 等到关闭信号发出且所有 `Done` 都已完成后返回

use std::future::Future;
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::{TaskTracker, task_tracker::TaskTrackerToken};
use tracing::debug;

/// 关闭时携带的致命错误
#[derive(Error, Debug, Clone)]
#[error("{0:#}")]
pub struct CloseError(pub Arc<anyhow::Error>);

/// 关闭协调器，可以廉价克隆并在任务间共享
#[derive(Clone, Default)]
pub struct SafeClose {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    token: CancellationToken,
    tracker: TaskTracker,
    reason: OnceLock<Option<Arc<anyhow::Error>>>,
}

/// 清理完成句柄，调用 `done()` 或直接 drop 都表示完成
#[must_use = "dropping Done immediately marks the cleanup as finished"]
pub struct Done {
    _token: TaskTrackerToken,
}

impl Done {
    pub fn done(self) {}
}

/// 只读的关闭信号
#[derive(Clone)]
pub struct CloseSignal {
    token: CancellationToken,
}

impl CloseSignal {
    /// 等待关闭信号
    pub async fn closed(&self) {
        self.token.cancelled().await
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl SafeClose {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册清理任务
    ///
    /// 任务立即在 tokio 运行时上启动，通常先等待 `CloseSignal`，完成清理后释放 `Done`。
    pub fn attach<F, Fut>(&self, cleanup: F)
    where
        F: FnOnce(Done, CloseSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let done = Done {
            _token: self.inner.tracker.token(),
        };
        tokio::spawn(cleanup(done, self.receive_close_signal()));
    }

    /// 发送关闭信号，只有第一次调用生效
    pub fn send_close_signal(&self, err: Option<anyhow::Error>) {
        if self.inner.reason.set(err.map(Arc::new)).is_ok() {
            debug!("close signal sent");
            self.inner.token.cancel();
        } else {
            debug!("close signal already sent, ignoring");
        }
    }

    pub fn receive_close_signal(&self) -> CloseSignal {
        CloseSignal {
            token: self.inner.token.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// 等待关闭完成，返回第一次 `send_close_signal` 携带的错误
    pub async fn wait_closed(&self) -> Result<(), CloseError> {
        self.inner.token.cancelled().await;
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        match self.inner.reason.get() {
            Some(Some(err)) => Err(CloseError(err.clone())),
            _ => Ok(()),
        }
    }
}
