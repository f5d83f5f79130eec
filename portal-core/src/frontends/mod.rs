// 嵌入式前端用于部署，磁盘前端用于本地调试 UI。
pub mod provider_embed;

#[cfg(any(test, feature = "backend_mock"))]
pub mod provider_disk;
