use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use tracing::{debug, trace};

use super::types::{NetworkIdentity, ProbeOutcome};
use crate::error::ProxyResult;

/// Default display-name pattern, matching netsh's `SSID : <name>` line
pub const DEFAULT_SSID_PATTERN: &str = r"^[ \t]*SSID[ \t]*:[ \t]*(.*)$";

/// Default stable-identifier pattern, matching netsh's `BSSID : <mac>` line
pub const DEFAULT_BSSID_PATTERN: &str = r"^[ \t]*BSSID[ \t]*:[ \t]*(.+)$";

/// Anything that can describe the wireless interface as free text.
#[async_trait]
pub trait NetworkStatusSource: Send + Sync {
    async fn status_text(&self) -> ProxyResult<String>;
}

/// The two single-line patterns used to pull the identity out of a status
/// report. Both are compiled multi-line and case-insensitive; the first
/// capture group holds the value.
#[derive(Debug, Clone)]
pub struct StatusPatterns {
    display_name: Regex,
    stable_id: Regex,
}

impl StatusPatterns {
    pub fn new(display_name: &str, stable_id: &str) -> ProxyResult<Self> {
        Ok(Self {
            display_name: compile(display_name)?,
            stable_id: compile(stable_id)?,
        })
    }
}

impl Default for StatusPatterns {
    fn default() -> Self {
        Self::new(DEFAULT_SSID_PATTERN, DEFAULT_BSSID_PATTERN)
            .expect("BUG: built-in status patterns are invalid")
    }
}

fn compile(pattern: &str) -> ProxyResult<Regex> {
    Ok(RegexBuilder::new(pattern)
        .multi_line(true)
        .case_insensitive(true)
        .build()?)
}

/// Query `source` and extract the current identity.
pub async fn probe(
    source: &dyn NetworkStatusSource,
    patterns: &StatusPatterns,
) -> ProxyResult<ProbeOutcome> {
    let text = source.status_text().await?;
    Ok(parse_status(&text, patterns))
}

/// Extract the identity from a status report. Never fails: a missing or
/// malformed stable identifier means `Disconnected`, a missing name means
/// an identity without a display name.
pub fn parse_status(text: &str, patterns: &StatusPatterns) -> ProbeOutcome {
    let stable_id = match first_capture(&patterns.stable_id, text) {
        Some(id) => id,
        None => {
            trace!("No stable identifier in status report");
            return ProbeOutcome::Disconnected;
        }
    };

    if !is_hardware_address(stable_id) {
        debug!(value = stable_id, "Ignoring malformed stable identifier");
        return ProbeOutcome::Disconnected;
    }

    let display_name = first_capture(&patterns.display_name, text);
    ProbeOutcome::Connected(NetworkIdentity::new(display_name, stable_id))
}

fn first_capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|value| !value.is_empty())
}

/// Six hex octets separated by `:` or `-`
fn is_hardware_address(value: &str) -> bool {
    let octets: Vec<&str> = value.split([':', '-']).collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStatus;

    const CONNECTED: &str = "\r\n\
There is 1 interface on the system:\r\n\
\r\n\
    Name                   : Wi-Fi\r\n\
    Description            : Intel(R) Wi-Fi 6 AX201 160MHz\r\n\
    GUID                   : 1c2d3e4f-0000-4000-8000-123456789abc\r\n\
    Physical address       : 3c:58:c2:11:22:33\r\n\
    State                  : connected\r\n\
    SSID                   : CafeWifi\r\n\
    BSSID                  : aa:bb:cc:dd:ee:ff\r\n\
    Network type           : Infrastructure\r\n\
    Radio type             : 802.11ax\r\n\
    Signal                 : 92%\r\n\
\r\n\
    Hosted network status  : Not available\r\n";

    const DISCONNECTED: &str = "\r\n\
There is 1 interface on the system:\r\n\
\r\n\
    Name                   : Wi-Fi\r\n\
    State                  : disconnected\r\n\
    Radio status           : Hardware On\r\n";

    fn connected(name: Option<&str>, id: &str) -> ProbeOutcome {
        ProbeOutcome::Connected(NetworkIdentity::new(name, id))
    }

    #[test]
    fn parses_netsh_report() {
        assert_eq!(
            parse_status(CONNECTED, &StatusPatterns::default()),
            connected(Some("CafeWifi"), "aa:bb:cc:dd:ee:ff")
        );
    }

    #[test]
    fn ssid_pattern_does_not_pick_up_bssid_line() {
        let text = "    BSSID : 00:11:22:33:44:55\n    SSID : Office\n";
        assert_eq!(
            parse_status(text, &StatusPatterns::default()),
            connected(Some("Office"), "00:11:22:33:44:55")
        );
    }

    #[test]
    fn disconnected_report_has_no_identity() {
        assert_eq!(
            parse_status(DISCONNECTED, &StatusPatterns::default()),
            ProbeOutcome::Disconnected
        );
        assert_eq!(
            parse_status(
                "There is no wireless interface on the system.",
                &StatusPatterns::default()
            ),
            ProbeOutcome::Disconnected
        );
        assert_eq!(
            parse_status("", &StatusPatterns::default()),
            ProbeOutcome::Disconnected
        );
    }

    #[test]
    fn empty_ssid_keeps_identity_without_name() {
        let text = "    SSID                   : \n    BSSID                  : AA:BB:CC:DD:EE:FF\n";
        assert_eq!(
            parse_status(text, &StatusPatterns::default()),
            connected(None, "AA:BB:CC:DD:EE:FF")
        );
    }

    #[test]
    fn keys_match_case_insensitively_and_first_match_wins() {
        let text = "ssid: first\nbssid: 11-22-33-44-55-66\nSSID: second\nBSSID: 99:99:99:99:99:99\n";
        assert_eq!(
            parse_status(text, &StatusPatterns::default()),
            connected(Some("first"), "11-22-33-44-55-66")
        );
    }

    #[test]
    fn malformed_stable_id_degrades_to_disconnected() {
        for bad in ["BSSID : not-a-mac", "BSSID : aa:bb:cc:dd:ee", "BSSID : zz:bb:cc:dd:ee:ff"] {
            assert_eq!(
                parse_status(bad, &StatusPatterns::default()),
                ProbeOutcome::Disconnected,
                "{bad}"
            );
        }
    }

    #[test]
    fn custom_patterns() {
        let patterns =
            StatusPatterns::new(r"^\s*SSID:\s*(.*)$", r"^Connected to ([0-9a-f:]{17})").unwrap();
        let iw = "Connected to 00:11:22:33:44:55 (on wlan0)\n\tSSID: HomeNet\n\tfreq: 5180\n";
        assert_eq!(
            parse_status(iw, &patterns),
            connected(Some("HomeNet"), "00:11:22:33:44:55")
        );
        assert!(StatusPatterns::new("(", DEFAULT_BSSID_PATTERN).is_err());
    }

    #[tokio::test]
    async fn probe_reads_the_source() {
        let source = FakeStatus::new(CONNECTED);
        let outcome = probe(&source, &StatusPatterns::default()).await.unwrap();
        assert_eq!(outcome.stable_id(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(source.queries(), 1);
    }

    #[tokio::test]
    async fn probe_surfaces_source_failures() {
        let source = FakeStatus::failing();
        assert!(probe(&source, &StatusPatterns::default()).await.is_err());
    }
}
