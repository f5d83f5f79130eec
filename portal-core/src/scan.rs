//! Parser for `nmcli -t -f SSID,BSSID,SIGNAL,SECURITY dev wifi` output.
//!
//! Terse mode prints one access point per line with the fields separated by
//! colons. Colons that belong to a field value are escaped as `\:`, but the
//! parser does not rely on that: it splits on every colon and assigns the
//! segments to fields by counting from the end of the line, where the layout
//! is fixed (six BSSID octets, then SIGNAL, then SECURITY).

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

/// Display name used for access points that do not broadcast an SSID.
pub const HIDDEN_NETWORK_NAME: &str = "Hidden Network";

const BSSID_OCTETS: usize = 6;
/// BSSID octets followed by SIGNAL and SECURITY.
const TRAILER_SEGMENTS: usize = BSSID_OCTETS + 2;
/// 少于该段数的行视为格式错误
const MIN_SEGMENTS: usize = BSSID_OCTETS + 1;

/// Coarse signal bucket shown next to each network in the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
}

impl SignalQuality {
    /// `> 75` is Excellent, `> 50` is Good, everything else (including 0 from
    /// an unparsable signal) is Fair.
    pub fn from_rssi(rssi: i32) -> Self {
        if rssi > 75 {
            Self::Excellent
        } else if rssi > 50 {
            Self::Good
        } else {
            Self::Fair
        }
    }
}

/// Security scheme of an access point, reduced from nmcli's SECURITY column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Security {
    /// nmcli reports `--` for networks without security.
    Open,
    Wpa2,
    Wpa3,
    Wpa,
    Wep,
    /// Anything nmcli prints that does not mention a known scheme (e.g. `OWE`).
    Other(String),
}

impl Security {
    pub fn from_nmcli(raw: &str) -> Self {
        let raw = raw.trim();
        // 顺序很重要："WPA2 WPA3" 归为 WPA2，"WPA1 WPA2" 同样归为 WPA2
        if raw == "--" {
            Self::Open
        } else if raw.contains("WPA2") {
            Self::Wpa2
        } else if raw.contains("WPA3") {
            Self::Wpa3
        } else if raw.contains("WPA") {
            Self::Wpa
        } else if raw.contains("WEP") {
            Self::Wep
        } else {
            Self::Other(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "None",
            Self::Wpa2 => "WPA2",
            Self::Wpa3 => "WPA3",
            Self::Wpa => "WPA",
            Self::Wep => "WEP",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Security {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Represents a single Wi-Fi network found during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    /// BSSID of the strongest access point seen for this name.
    pub id: String,
    pub name: String,
    #[serde(rename = "signal")]
    pub signal_quality: SignalQuality,
    /// 信号强度，nmcli 报告的 0 到 100
    pub rssi: i32,
    pub security: Security,
}

/// Which column of the terse record a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ssid,
    Bssid,
    Signal,
    Security,
}

/// The segments of one line, grouped by column but not yet decoded.
#[derive(Debug, Default)]
struct RawRecord<'a> {
    ssid: Vec<&'a str>,
    bssid: Vec<&'a str>,
    signal: &'a str,
    security: &'a str,
}

impl<'a> RawRecord<'a> {
    fn tokenize(line: &'a str) -> Option<Self> {
        let segments: Vec<&'a str> = line.split(':').collect();
        let count = segments.len();
        if count < MIN_SEGMENTS {
            return None;
        }

        let mut record = RawRecord::default();

        if count == MIN_SEGMENTS {
            // Compact layout: a single SSID segment and everything after it is
            // taken as the BSSID block. SIGNAL and SECURITY stay the last two
            // segments.
            record.ssid.push(segments[0]);
            record.bssid.extend_from_slice(&segments[1..]);
            record.signal = segments[count - 2];
            record.security = segments[count - 1];
            return Some(record);
        }

        let bssid_start = count - TRAILER_SEGMENTS;
        let mut state = Field::Ssid;
        let mut octets = 0;
        for (index, segment) in segments.into_iter().enumerate() {
            if state == Field::Ssid && index == bssid_start {
                state = Field::Bssid;
            }
            match state {
                Field::Ssid => record.ssid.push(segment),
                Field::Bssid => {
                    record.bssid.push(segment);
                    octets += 1;
                    if octets == BSSID_OCTETS {
                        state = Field::Signal;
                    }
                }
                Field::Signal => {
                    record.signal = segment;
                    state = Field::Security;
                }
                Field::Security => record.security = segment,
            }
        }
        Some(record)
    }

    fn into_network(self) -> Network {
        let ssid = unescape_ssid(&self.ssid.join(":"));
        let rssi = parse_signal(self.signal);
        let name = if ssid.is_empty() {
            HIDDEN_NETWORK_NAME.to_string()
        } else {
            ssid
        };

        Network {
            id: self.bssid.join(":"),
            name,
            signal_quality: SignalQuality::from_rssi(rssi),
            rssi,
            security: Security::from_nmcli(self.security),
        }
    }
}

/// Restores colons in an SSID: nmcli's terse mode writes `:` as `\:`.
/// Nothing else is decoded, so any other backslash is kept as written.
pub(crate) fn unescape_ssid(raw: &str) -> String {
    raw.replace("\\:", ":")
}

fn parse_signal(raw: &str) -> i32 {
    raw.trim().parse().unwrap_or(0)
}

/// Parses a single terse line. Returns `None` when the line has too few
/// fields to contain a BSSID.
pub(crate) fn parse_line(line: &str) -> Option<Network> {
    RawRecord::tokenize(line).map(RawRecord::into_network)
}

/// Converts the output of `nmcli -t -f SSID,BSSID,SIGNAL,SECURITY dev wifi`
/// into one entry per network name, strongest first.
///
/// Blank lines are ignored and malformed lines are skipped with a warning;
/// this never fails.
pub fn parse_scan_output(output: &str) -> Vec<Network> {
    let networks = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let network = parse_line(line);
            if network.is_none() {
                tracing::warn!(line, "Skipping malformed scan line");
            }
            network
        });

    dedup_by_name(networks)
}

/// Keeps the strongest entry per name. On equal signal the first one seen
/// wins. The result is sorted by descending `rssi`, then by name.
pub fn dedup_by_name(networks: impl IntoIterator<Item = Network>) -> Vec<Network> {
    let mut strongest: HashMap<String, Network> = HashMap::new();
    for network in networks {
        match strongest.entry(network.name.clone()) {
            Entry::Occupied(mut slot) => {
                if network.rssi > slot.get().rssi {
                    slot.insert(network);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(network);
            }
        }
    }

    let mut unique: Vec<Network> = strongest.into_values().collect();
    unique.sort_by(|a, b| b.rssi.cmp(&a.rssi).then_with(|| a.name.cmp(&b.name)));
    unique
}
