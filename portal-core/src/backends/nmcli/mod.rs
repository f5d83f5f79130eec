use crate::config::NmcliConfig;
use crate::process::{CommandRunner, ProcessRunner, classify_failure};
use crate::scan::{Network, parse_scan_output, unescape_ssid};
use crate::traits::{ConnectionRequest, WifiBackend};
use crate::{Error, Result};
use async_trait::async_trait;

// 通过调用 nmcli 命令行工具实现的后端，适用于使用 NetworkManager 管理网络连接的 Linux 系统

const SCAN_ARGS: [&str; 5] = ["-t", "-f", "SSID,BSSID,SIGNAL,SECURITY", "dev", "wifi"];
const PROFILE_ARGS: [&str; 5] = ["-t", "-f", "NAME", "connection", "show"];
/// nmcli 成功连接后输出中包含的标记
const ACTIVATED_MARKER: &str = "successfully activated";

#[derive(Debug)]
pub struct NmcliBackend<R = ProcessRunner> {
    runner: R,
}

impl NmcliBackend {
    pub fn new(config: &NmcliConfig) -> Self {
        Self::with_runner(ProcessRunner::new(
            config.program.clone(),
            config.use_sudo,
            config.command_timeout(),
        ))
    }
}

impl<R: CommandRunner> NmcliBackend<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// Runs nmcli and returns its combined output, or the classified error
    /// when it exits unsuccessfully.
    async fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.runner.run(args).await?;
        if !output.success {
            tracing::error!(
                status = %output.exit_description(),
                output = %output.text.trim(),
                "nmcli command failed"
            );
            return Err(classify_failure(&output));
        }
        Ok(output.text)
    }
}

#[async_trait]
impl<R: CommandRunner> WifiBackend for NmcliBackend<R> {
    async fn scan(&self) -> Result<Vec<Network>> {
        tracing::debug!("Scanning via nmcli");
        let output = self.run_checked(&SCAN_ARGS).await?;
        let networks = parse_scan_output(&output);
        tracing::info!(count = networks.len(), "Scan complete");
        Ok(networks)
    }

    async fn connect(&self, req: &ConnectionRequest) -> Result<()> {
        tracing::info!(ssid = %req.ssid, "Connecting via nmcli");
        let mut args = vec!["device", "wifi", "connect", req.ssid.as_str()];
        if !req.password.is_empty() {
            args.extend(["password", req.password.as_str()]);
        }

        let output = self.run_checked(&args).await?;
        if output.contains(ACTIVATED_MARKER) {
            tracing::info!(ssid = %req.ssid, "Connection activated");
            Ok(())
        } else {
            tracing::warn!(ssid = %req.ssid, output = %output.trim(), "nmcli did not activate the connection");
            Err(Error::ConnectionNotActivated(output))
        }
    }

    async fn has_saved_profile(&self, ssid: &str) -> Result<bool> {
        let output = self.run_checked(&PROFILE_ARGS).await?;
        Ok(output
            .lines()
            .any(|name| unescape_ssid(name.trim_end()) == ssid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CommandOutput;
    use std::sync::Mutex;

    /// 记录调用参数，并返回预设输出
    struct ScriptedRunner {
        output: CommandOutput,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        fn new(success: bool, text: &str) -> Self {
            Self {
                output: CommandOutput {
                    success,
                    exit_code: Some(if success { 0 } else { 4 }),
                    text: text.to_string(),
                },
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push(args.iter().map(|a| a.to_string()).collect());
            Ok(self.output.clone())
        }
    }

    fn request(ssid: &str, password: &str) -> ConnectionRequest {
        ConnectionRequest {
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_scan_parses_output() {
        let backend = NmcliBackend::with_runner(ScriptedRunner::new(
            true,
            "Home:AA:BB:CC:DD:EE:01:82:WPA2\nHome:AA:BB:CC:DD:EE:02:40:WPA2\nCafe:AA:BB:CC:DD:EE:03:55:--\n",
        ));
        let networks = backend.scan().await.unwrap();
        assert_eq!(networks.len(), 2);
        assert_eq!(networks[0].name, "Home");
        assert_eq!(networks[0].rssi, 82);
        assert_eq!(
            backend.runner.calls(),
            [["-t", "-f", "SSID,BSSID,SIGNAL,SECURITY", "dev", "wifi"]]
        );
    }

    #[tokio::test]
    async fn test_scan_failure_is_classified() {
        let backend = NmcliBackend::with_runner(ScriptedRunner::new(
            false,
            "Error: User not authorized to perform this operation.",
        ));
        assert!(matches!(backend.scan().await, Err(Error::NotAuthorized(_))));
    }

    #[tokio::test]
    async fn test_connect_with_password() {
        let backend = NmcliBackend::with_runner(ScriptedRunner::new(
            true,
            "Device 'wlan0' successfully activated with 'f1d2…'.",
        ));
        backend.connect(&request("Home", "hunter22")).await.unwrap();
        assert_eq!(
            backend.runner.calls(),
            [["device", "wifi", "connect", "Home", "password", "hunter22"]]
        );
    }

    #[tokio::test]
    async fn test_connect_open_network_omits_password() {
        let backend = NmcliBackend::with_runner(ScriptedRunner::new(
            true,
            "Device 'wlan0' successfully activated with 'abc'.",
        ));
        backend.connect(&request("Cafe", "")).await.unwrap();
        assert_eq!(backend.runner.calls(), [["device", "wifi", "connect", "Cafe"]]);
    }

    #[tokio::test]
    async fn test_connect_without_activation() {
        let backend = NmcliBackend::with_runner(ScriptedRunner::new(true, "Connection pending"));
        let err = backend.connect(&request("Home", "pw")).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionNotActivated(out) if out == "Connection pending"));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let backend = NmcliBackend::with_runner(ScriptedRunner::new(
            false,
            "Error: Connection activation failed: Secrets were required, but not provided.",
        ));
        let err = backend.connect(&request("Home", "wrong")).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_saved_profile_exact_match() {
        let backend = NmcliBackend::with_runner(ScriptedRunner::new(
            true,
            "Wired connection 1\nHome\nmy\\:network\nlo\n",
        ));
        assert!(backend.has_saved_profile("Home").await.unwrap());
        assert!(backend.has_saved_profile("my:network").await.unwrap());
        assert!(!backend.has_saved_profile("Hom").await.unwrap());
        assert!(!backend.has_saved_profile("Office").await.unwrap());
        assert_eq!(
            backend.runner.calls()[0],
            ["-t", "-f", "NAME", "connection", "show"]
        );
    }
}
