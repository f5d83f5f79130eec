use crate::{Error, Result};

/// Whether this build targets Linux, the only host with `nmcli`.
pub fn is_linux() -> bool {
    cfg!(target_os = "linux")
}

/// 非 Linux 主机上拒绝执行 nmcli 相关操作
pub fn ensure_supported() -> Result<()> {
    if is_linux() {
        Ok(())
    } else {
        Err(Error::UnsupportedPlatform(std::env::consts::OS))
    }
}
