//! 日志初始化

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogConfig, LogFormat};
use crate::error::{GuberError, Result};

/// 由 `log.level` 构建过滤器
///
/// `honor_env` 为 true 时 `RUST_LOG` 优先于配置
pub fn env_filter(config: &LogConfig, honor_env: bool) -> Result<EnvFilter> {
    let level: tracing::Level = config
        .level
        .parse()
        .map_err(|_| GuberError::config(format!("invalid log level: {}", config.level)))?;

    let fixed = || EnvFilter::new(level.to_string());
    if honor_env {
        Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| fixed()))
    } else {
        Ok(fixed())
    }
}

/// 初始化全局 tracing subscriber，`RUST_LOG` 优先于配置中的 `log.level`
///
/// 重复初始化（例如测试中）不会报错。
pub fn init_logging(config: &LogConfig) -> Result<()> {
    install(config, env_filter(config, true)?);
    Ok(())
}

/// 与 `init_logging` 相同，但忽略 `RUST_LOG`，只使用配置中的级别
pub fn init_logging_fixed(config: &LogConfig) -> Result<()> {
    install(config, env_filter(config, false)?);
    Ok(())
}

fn install(config: &LogConfig, filter: EnvFilter) {
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };
    if result.is_err() {
        tracing::debug!("global subscriber already installed, keeping it");
    }
}
