//! Core library for the Wi-Fi captive portal.
//! This crate parses `nmcli` terse scan output, drives `nmcli` for joining
//! networks, orchestrates the hotspot processes and serves the portal UI and
//! JSON API over axum. Backend and frontend implementations are selected by
//! feature flags (see `factory`).

pub mod backends;
pub mod config;
pub mod factory;
pub mod frontends;
pub mod hotspot;
pub mod platform;
pub mod process;
pub mod scan;
pub mod traits;
pub mod web_server;

// Define a shared Error and Result type for the entire crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// 命令以非零状态退出，且输出中没有可识别的原因
    #[error("Command failed: {details}")]
    CommandFailed { details: String, output: String },

    #[error("Command not found: {0}")]
    ToolNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not authorized: {0}")]
    NotAuthorized(String),

    #[error("Command timed out after {timeout:?}: {command}")]
    CommandTimedOut {
        command: String,
        timeout: std::time::Duration,
    },

    /// nmcli 正常退出，但没有报告连接已激活
    #[error("Connection was not activated: {0}")]
    ConnectionNotActivated(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(&'static str),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Web server error: {0}")]
    WebServer(#[from] axum::BoxError),
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
