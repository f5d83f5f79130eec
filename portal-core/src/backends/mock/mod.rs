use crate::scan::{Network, parse_scan_output};
use crate::traits::{ConnectionRequest, WifiBackend};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// Canned `nmcli -t` scan output, fed through the real parser.
const FAKE_SCAN: &str = r"MyHomeWiFi:A4:2B:B0:11:22:33:95:WPA2 WPA3
MyHomeWiFi:A4:2B:B0:11:22:34:61:WPA2 WPA3
CafeGuest:00:1A:2B:3C:4D:5E:78:--
Neighbor's\:Network:C8:3A:35:00:00:01:55:WPA1 WPA2
xfinitywifi:F0:9F:C2:10:20:30:88:WPA2
:F0:9F:C2:10:20:31:42:WPA2
IoT-Legacy:00:0F:66:AA:BB:CC:23:WEP
";

/// 连接到该 SSID 时模拟失败
const FAILING_SSID: &str = "xfinitywifi";
/// 模拟已保存过的连接配置
const SAVED_PROFILE: &str = "MyHomeWiFi";

/// A mock backend for UI development.
/// It simulates scanning and connecting without any real hardware interaction.
#[derive(Debug)]
pub struct MockBackend {
    delay: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_secs(2))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WifiBackend for MockBackend {
    async fn scan(&self) -> Result<Vec<Network>> {
        tracing::info!("🤖 [MockBackend] Scanning for networks...");
        sleep(self.delay).await;

        let networks = parse_scan_output(FAKE_SCAN);
        tracing::info!("🤖 [MockBackend] Found {} networks.", networks.len());
        Ok(networks)
    }

    async fn connect(&self, req: &ConnectionRequest) -> Result<()> {
        tracing::info!(
            "🤖 [MockBackend] Attempting to connect to SSID: '{}' with password: '{}'",
            req.ssid,
            if req.password.is_empty() { "(empty)" } else { "********" }
        );
        sleep(self.delay).await;

        // Simulate a failure for a specific network for testing purposes
        if req.ssid == FAILING_SSID {
            tracing::warn!("🤖 [MockBackend] Connection failed to '{}'", req.ssid);
            Err(Error::CommandFailed {
                details: "exit status 4".to_string(),
                output: "Error: Connection activation failed: Secrets were required, but not provided.".to_string(),
            })
        } else {
            tracing::info!("🤖 [MockBackend] Connection successful to '{}'", req.ssid);
            Ok(())
        }
    }

    async fn has_saved_profile(&self, ssid: &str) -> Result<bool> {
        Ok(ssid == SAVED_PROFILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{HIDDEN_NETWORK_NAME, Security};

    #[tokio::test]
    async fn test_mock_scan_is_deduplicated() {
        let backend = MockBackend::with_delay(Duration::ZERO);
        let networks = backend.scan().await.unwrap();
        assert_eq!(networks.len(), 6);
        assert_eq!(networks[0].name, "MyHomeWiFi");
        assert_eq!(networks[0].rssi, 95);
        assert!(networks.iter().any(|n| n.name == "Neighbor's:Network"));
        assert!(networks.iter().any(|n| n.name == HIDDEN_NETWORK_NAME));
        let cafe = networks.iter().find(|n| n.name == "CafeGuest").unwrap();
        assert_eq!(cafe.security, Security::Open);
    }

    #[tokio::test]
    async fn test_mock_connect() {
        let backend = MockBackend::with_delay(Duration::ZERO);
        let ok = ConnectionRequest {
            ssid: "CafeGuest".into(),
            password: String::new(),
        };
        backend.connect(&ok).await.unwrap();

        let failing = ConnectionRequest {
            ssid: FAILING_SSID.into(),
            password: "secret".into(),
        };
        assert!(backend.connect(&failing).await.is_err());
        assert!(backend.has_saved_profile("MyHomeWiFi").await.unwrap());
        assert!(!backend.has_saved_profile("CafeGuest").await.unwrap());
    }
}
