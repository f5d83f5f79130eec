//! Soft-AP orchestration: takes the wireless interface away from
//! NetworkManager and runs hostapd + dnsmasq on it so clients can reach the
//! portal.

use crate::config::HotspotConfig;
use crate::process::privileged;
use crate::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// 接口重置后等待的时间
const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Hotspot {
    config: HotspotConfig,
    hostapd: Mutex<Option<Child>>,
    dnsmasq: Mutex<Option<Child>>,
}

impl Hotspot {
    pub fn new(config: HotspotConfig) -> Self {
        Self {
            config,
            hostapd: Mutex::new(None),
            dnsmasq: Mutex::new(None),
        }
    }

    fn command(&self, program: &str) -> Command {
        privileged(program, self.config.use_sudo)
    }

    fn link_command(&self, state: &str) -> Command {
        let mut cmd = self.command("ip");
        cmd.args(["link", "set", self.config.interface.as_str(), state]);
        cmd
    }

    fn hostapd_command(&self) -> Command {
        let mut cmd = self.command("hostapd");
        cmd.arg(&self.config.hostapd_conf);
        cmd
    }

    fn dnsmasq_command(&self) -> Command {
        let mut cmd = self.command("dnsmasq");
        cmd.arg("-C")
            .arg(&self.config.dnsmasq_conf)
            .arg("-i")
            .arg(&self.config.interface);
        cmd
    }

    /// Brings the interface up in AP mode and launches hostapd + dnsmasq.
    pub async fn start(&self) -> Result<()> {
        let iface = self.config.interface.as_str();

        tracing::info!(iface, "Bringing interface down and cleaning up...");
        run_best_effort(self.link_command("down"), "ip link set down").await;
        let mut flush = self.command("ip");
        flush.args(["addr", "flush", "dev", iface]);
        run_best_effort(flush, "ip addr flush").await;

        if self.config.stop_network_manager {
            tracing::info!("Stopping NetworkManager and wpa_supplicant...");
            let mut stop_nm = self.command("systemctl");
            stop_nm.args(["stop", "NetworkManager"]);
            run_best_effort(stop_nm, "systemctl stop NetworkManager").await;
            let mut kill_wpa = self.command("killall");
            kill_wpa.arg("wpa_supplicant");
            run_best_effort(kill_wpa, "killall wpa_supplicant").await;
        }

        tokio::time::sleep(SETTLE_DELAY).await;

        tracing::info!(iface, "Bringing interface up...");
        run_required(self.link_command("up"), "ip link set up").await?;

        // 配置网关 IP，已存在时忽略
        let output = self
            .command("ip")
            .args(["addr", "add", self.config.gateway_cidr.as_str(), "dev", iface])
            .output()
            .await?;
        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            if !err.contains("File exists") {
                return Err(Error::CommandFailed {
                    details: format!("Failed to set IP {}", self.config.gateway_cidr),
                    output: err.trim().to_string(),
                });
            }
        }

        tracing::info!(conf = %self.config.hostapd_conf.display(), "Starting hostapd...");
        let hostapd = spawn_logged(self.hostapd_command(), "hostapd")?;
        *self.hostapd.lock().await = Some(hostapd);

        tokio::time::sleep(SETTLE_DELAY).await;

        tracing::info!(conf = %self.config.dnsmasq_conf.display(), "Starting dnsmasq...");
        let dnsmasq = spawn_logged(self.dnsmasq_command(), "dnsmasq")?;
        *self.dnsmasq.lock().await = Some(dnsmasq);

        tracing::info!(iface, "Hotspot is running.");
        Ok(())
    }

    /// Stops hostapd and dnsmasq. Safe to call when nothing is running.
    pub async fn stop(&self) -> Result<()> {
        tracing::info!("Stopping hostapd and dnsmasq...");
        if let Some(mut child) = self.dnsmasq.lock().await.take() {
            let _ = child.kill().await;
        }
        if let Some(mut child) = self.hostapd.lock().await.take() {
            let _ = child.kill().await;
        }

        // 通过 sudo 启动时，kill 只结束 sudo 本身
        for program in ["hostapd", "dnsmasq"] {
            let mut cmd = self.command("killall");
            cmd.arg(program);
            run_best_effort(cmd, "killall").await;
        }
        Ok(())
    }
}

async fn run_best_effort(mut cmd: Command, ctx: &str) {
    match cmd.output().await {
        Ok(out) if !out.status.success() => {
            let err = String::from_utf8_lossy(&out.stderr);
            tracing::warn!(context = %ctx, stderr = %err.trim(), "command failed");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(context = %ctx, error = %e, "failed to spawn command"),
    }
}

async fn run_required(mut cmd: Command, ctx: &str) -> Result<()> {
    let out = cmd.output().await?;
    if !out.status.success() {
        let err = String::from_utf8_lossy(&out.stderr);
        tracing::error!(context = %ctx, stderr = %err.trim(), "command failed");
        return Err(Error::CommandFailed {
            details: format!("{} failed: {}", ctx, out.status),
            output: err.trim().to_string(),
        });
    }
    Ok(())
}

/// Spawns a long-running daemon and forwards its output to the log.
fn spawn_logged(mut cmd: Command, name: &'static str) -> Result<Child> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    forward_output(name, child.stdout.take());
    forward_output(name, child.stderr.take());
    Ok(child)
}

fn forward_output<R>(name: &'static str, stream: Option<R>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(stream) = stream else {
        return;
    };
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::info!(process = name, "{}", line);
        }
    });
}
