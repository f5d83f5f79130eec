use crate::config::AppConfig;
use crate::traits::{UiAssetProvider, WifiBackend};
use std::sync::Arc;

/// Backend selected at compile time: the mock backend with `backend_mock`,
/// nmcli otherwise.
pub fn create_backend(config: &AppConfig) -> Arc<dyn WifiBackend> {
    #[cfg(feature = "backend_mock")]
    {
        let _ = config;
        tracing::info!("🤖 Backend: Mock selected (for local development)");
        Arc::new(crate::backends::mock::MockBackend::new())
    }
    #[cfg(not(feature = "backend_mock"))]
    {
        tracing::info!(program = %config.nmcli.program, sudo = config.nmcli.use_sudo, "📡 Backend: nmcli selected");
        Arc::new(crate::backends::nmcli::NmcliBackend::new(&config.nmcli))
    }
}

/// Mock builds read the UI from disk so it can be edited live; real builds
/// serve the embedded copy.
pub fn create_frontend(config: &AppConfig) -> Arc<dyn UiAssetProvider> {
    #[cfg(feature = "backend_mock")]
    {
        tracing::info!(dir = %config.server.static_dir.display(), "💿 Frontend: Disk Provider selected (for local development)");
        Arc::new(crate::frontends::provider_disk::DiskFrontend::new(
            config.server.static_dir.clone(),
        ))
    }
    #[cfg(not(feature = "backend_mock"))]
    {
        let _ = config;
        tracing::info!("📦 Frontend: Embed Provider selected (for deployment)");
        Arc::new(crate::frontends::provider_embed::EmbedFrontend::new())
    }
}
