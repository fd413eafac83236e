use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use guber::logging::{init_logging, init_logging_fixed};
use guber::{Config, Guber};
use tracing::{info, warn};

/// Guber CLI
#[derive(Parser)]
#[command(name = "guber")]
#[command(about = "A Nacos Application-IP-Hosts register service.", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start guber main program.
    Start {
        /// Configuration file path
        #[arg(short, long, env = "GUBER_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Dry run with the config file.
    Run {
        /// Configuration file path
        #[arg(short, long, env = "GUBER_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print out version info and exit.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Start { config } => start(config).await,
        Command::Run { config } => dry_run(config).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn start(config_path: Option<PathBuf>) -> Result<()> {
    let (config, file_used) =
        Config::load(config_path.as_deref()).context("fail to load config")?;
    init_logging(&config.log)?;
    info!(file = %file_used.display(), "main config loaded");

    let guber = Guber::start(&config).await?;

    let safe_close = guber.safe_close().clone();
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        warn!(signal, "signal received");
        safe_close.send_close_signal(None);
    });

    guber.wait_closed().await.context("server exited")?;
    info!("server exited");
    Ok(())
}

async fn dry_run(config_path: Option<PathBuf>) -> Result<()> {
    let (mut config, _) = Config::load(config_path.as_deref()).context("failed to init service")?;
    config.log.level = "error".to_string();
    init_logging_fixed(&config.log)?;

    println!("{}", Guber::status(&config).await);
    Ok(())
}

/// 等待 SIGINT / SIGTERM，返回信号名称
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
