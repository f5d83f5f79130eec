use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 顶层应用配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// [server] 表
    pub server: ServerConfig,
    /// [nmcli] 表
    pub nmcli: NmcliConfig,
    /// [hotspot] 表
    pub hotspot: HotspotConfig,
}

// ============= Web 服务器配置 =============

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Where captive-portal probes are redirected to.
    pub portal_url: String,
    /// 必须大于 `nmcli.command_timeout_secs`，否则命令超时无法以 504 返回
    pub request_timeout_secs: u64,
    /// UI directory for the disk frontend.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            portal_url: "http://10.42.0.1:8080/".to_string(),
            request_timeout_secs: 45,
            static_dir: PathBuf::from("ui"),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============= nmcli 配置 =============

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NmcliConfig {
    pub program: String,
    pub use_sudo: bool,
    pub command_timeout_secs: u64,
}

impl Default for NmcliConfig {
    fn default() -> Self {
        Self {
            program: "nmcli".to_string(),
            use_sudo: true,
            command_timeout_secs: 30,
        }
    }
}

impl NmcliConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

// ============= 热点配置 =============

/// hostapd + dnsmasq 热点配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    pub enabled: bool,
    pub interface: String,
    /// 热点网关地址，启动时分配给接口
    pub gateway_cidr: String,
    pub hostapd_conf: PathBuf,
    pub dnsmasq_conf: PathBuf,
    /// 启动 AP 前停止 NetworkManager 并结束 wpa_supplicant
    pub stop_network_manager: bool,
    pub use_sudo: bool,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interface: "wlan0".to_string(),
            gateway_cidr: "10.42.0.1/24".to_string(),
            hostapd_conf: PathBuf::from("hostapd.conf"),
            dnsmasq_conf: PathBuf::from("dnsmasq.conf"),
            stop_network_manager: true,
            use_sudo: true,
        }
    }
}

// ============= 配置加载函数 =============

impl AppConfig {
    /// 从 TOML 字符串加载应用配置
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks settings that depend on each other.
    pub fn validate(&self) -> Result<()> {
        if self.server.request_timeout_secs <= self.nmcli.command_timeout_secs {
            return Err(Error::Config(format!(
                "server.request_timeout_secs ({}) must be greater than nmcli.command_timeout_secs ({})",
                self.server.request_timeout_secs, self.nmcli.command_timeout_secs
            )));
        }
        Ok(())
    }

    /// 从 TOML 文件加载应用配置
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}
