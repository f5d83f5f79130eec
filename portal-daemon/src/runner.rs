use anyhow::Context;
use portal_core::config::AppConfig;
use portal_core::factory::{create_backend, create_frontend};
use portal_core::hotspot::Hotspot;
use portal_core::web_server::{self, AppState};
use std::sync::Arc;

/// 启动热点 -> 运行 Web 服务器直到收到退出信号 -> 关闭热点
pub async fn run_portal(config: AppConfig) -> anyhow::Result<()> {
    let backend = create_backend(&config);
    let frontend = create_frontend(&config);

    let hotspot = config
        .hotspot
        .enabled
        .then(|| Hotspot::new(config.hotspot.clone()));

    if let Some(hotspot) = &hotspot {
        if let Err(e) = hotspot.start().await {
            // 清理可能已经启动的子进程
            let _ = hotspot.stop().await;
            return Err(e).context("Failed to start the hotspot");
        }
    } else {
        tracing::info!("Hotspot disabled, serving portal only");
    }

    let state = Arc::new(AppState {
        backend,
        frontend,
        portal_url: config.server.portal_url.clone(),
    });

    let served = web_server::run_server(&config.server, state, shutdown_signal()).await;

    if let Some(hotspot) = &hotspot {
        if let Err(e) = hotspot.stop().await {
            tracing::warn!("Failed to stop hotspot cleanly: {}", e);
        }
    }

    served.context("Web server failed")?;
    tracing::info!("🛑 Shutting down.");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
