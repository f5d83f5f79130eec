use async_trait::async_trait;
use serde::Deserialize;
use std::borrow::Cow;

use crate::scan::Network;

// 在这里定义后端和前端共享的请求类型与 trait。

/// Body of `POST /api/wifi/connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionRequest {
    /// 缺失时按空字符串处理，由处理函数返回具体的错误信息
    #[serde(default)]
    pub ssid: String,
    /// 开放网络时为空
    #[serde(default)]
    pub password: String,
}

/// Body of `POST /api/wifi/check-saved-profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckProfileRequest {
    #[serde(default)]
    pub ssid: String,
}

/// 前端资源提供者接口。
#[async_trait]
pub trait UiAssetProvider: Send + Sync {
    /// Retrieves a single UI asset.
    ///
    /// # Arguments
    /// * `path` - The path to the asset (e.g., "index.html", "style.css").
    ///
    /// # Returns
    /// The asset's content and its MIME type, or `Error::AssetNotFound`.
    async fn get_asset(&self, path: &str) -> crate::Result<(Cow<'static, [u8]>, String)>;
}

/// Wi-Fi 后端能力：扫描、连接、查询已保存的配置
#[async_trait]
pub trait WifiBackend: Send + Sync {
    /// Runs a scan and returns one entry per network name.
    async fn scan(&self) -> crate::Result<Vec<Network>>;

    /// Joins `req.ssid`. Resolves only once the connection is active.
    async fn connect(&self, req: &ConnectionRequest) -> crate::Result<()>;

    /// Whether a connection profile named `ssid` already exists.
    async fn has_saved_profile(&self, ssid: &str) -> crate::Result<bool>;
}
