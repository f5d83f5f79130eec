mod runner;

use anyhow::{Context, Result};
use clap::Parser;
use portal_core::config::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// 未指定 --config 时使用的内置配置
const DEFAULT_CONFIG: &str = include_str!("../../configs/portal.toml");

/// Captive portal for joining Wi-Fi networks through nmcli.
#[derive(Debug, Parser)]
#[command(name = "portal-daemon", version, about)]
struct Cli {
    /// TOML configuration file (defaults to the bundled configs/portal.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_addr`
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Serve the portal without starting hostapd/dnsmasq
    #[arg(long)]
    no_hotspot: bool,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::from_toml_str(DEFAULT_CONFIG).context("Bundled config is invalid")?,
    };
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if cli.no_hotspot {
        config.hotspot.enabled = false;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 初始化日志（这是入口点的职责）
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // 2. 加载配置并运行门户
    let result = match load_config(&cli) {
        Ok(config) => runner::run_portal(config).await,
        Err(e) => Err(e),
    };

    // 3. 处理顶层错误
    if let Err(e) = result {
        tracing::error!("❌ Portal failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
