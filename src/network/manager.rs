use async_trait::async_trait;
use tracing::{debug, warn};
use zbus::zvariant::OwnedObjectPath;
use zbus::Connection;

use super::dbus_proxies::{AccessPointProxy, DeviceProxy, NetworkManagerProxy, WirelessProxy};
use super::probe::NetworkStatusSource;
use crate::error::ProxyResult;

/// NMDeviceType for 802.11 devices
const NM_DEVICE_TYPE_WIFI: u32 = 2;

/// The access point a Wi-Fi device is associated with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAccessPoint {
    pub ssid: String,
    pub bssid: String,
}

/// High-level facade over the parts of NetworkManager's D-Bus API this crate
/// reads. Cheap to clone; clones share the bus connection.
#[derive(Clone)]
pub struct NetworkManager {
    connection: Connection,
}

impl NetworkManager {
    /// Connect to the system D-Bus
    pub async fn new() -> ProxyResult<Self> {
        let connection = Connection::system().await?;
        Ok(Self { connection })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Get NM version string
    pub async fn version(&self) -> ProxyResult<String> {
        let proxy = NetworkManagerProxy::new(&self.connection).await?;
        Ok(proxy.version().await?)
    }

    /// Find the first Wi-Fi device path
    pub async fn find_wifi_device(&self) -> ProxyResult<Option<OwnedObjectPath>> {
        let nm_proxy = NetworkManagerProxy::new(&self.connection).await?;
        let devices = nm_proxy.get_devices().await?;

        for path in devices {
            let dev_proxy = DeviceProxy::builder(&self.connection)
                .path(path.clone())?
                .build()
                .await?;

            if dev_proxy.device_type().await.unwrap_or(0) == NM_DEVICE_TYPE_WIFI {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// Interface name of a device, e.g. "wlan0"
    pub async fn interface_name(&self, device: &OwnedObjectPath) -> ProxyResult<String> {
        let dev_proxy = DeviceProxy::builder(&self.connection)
            .path(device.clone())?
            .build()
            .await?;
        Ok(dev_proxy.interface().await.unwrap_or_default())
    }

    /// The access point `device` is associated with, if any
    pub async fn active_access_point(
        &self,
        device: &OwnedObjectPath,
    ) -> ProxyResult<Option<ActiveAccessPoint>> {
        let wireless = WirelessProxy::builder(&self.connection)
            .path(device.clone())?
            .build()
            .await?;

        let ap_path = match wireless.active_access_point().await {
            Ok(p) if p.as_str() != "/" => p,
            Ok(_) => return Ok(None),
            Err(e) => {
                warn!("Failed to read active access point of {}: {}", device, e);
                return Ok(None);
            }
        };

        let ap = AccessPointProxy::builder(&self.connection)
            .path(ap_path)?
            .build()
            .await?;

        let ssid_bytes = ap.ssid().await.unwrap_or_default();
        let bssid = ap.hw_address().await.unwrap_or_default();

        Ok(Some(ActiveAccessPoint {
            ssid: String::from_utf8_lossy(&ssid_bytes).to_string(),
            bssid,
        }))
    }
}

/// Status source backed by NetworkManager. Renders the first Wi-Fi device
/// as a `key : value` report in netsh's layout so the same patterns parse it.
#[derive(Clone)]
pub struct NmStatusSource {
    nm: NetworkManager,
}

impl NmStatusSource {
    pub fn new(nm: NetworkManager) -> Self {
        Self { nm }
    }
}

#[async_trait]
impl NetworkStatusSource for NmStatusSource {
    async fn status_text(&self) -> ProxyResult<String> {
        let device = match self.nm.find_wifi_device().await? {
            Some(device) => device,
            None => {
                debug!("NetworkManager reports no Wi-Fi device");
                return Ok(String::new());
            }
        };

        let interface = self.nm.interface_name(&device).await?;
        let ap = self.nm.active_access_point(&device).await?;
        Ok(render_report(&interface, ap.as_ref()))
    }
}

/// Render one interface in the `netsh wlan show interfaces` layout
pub fn render_report(interface: &str, ap: Option<&ActiveAccessPoint>) -> String {
    let mut report = format!("    {:<22} : {}\n", "Name", interface);
    match ap {
        Some(ap) => {
            report.push_str(&format!("    {:<22} : {}\n", "State", "connected"));
            report.push_str(&format!("    {:<22} : {}\n", "SSID", ap.ssid));
            report.push_str(&format!("    {:<22} : {}\n", "BSSID", ap.bssid));
        }
        None => report.push_str(&format!("    {:<22} : {}\n", "State", "disconnected")),
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::probe::{parse_status, StatusPatterns};
    use crate::network::types::{NetworkIdentity, ProbeOutcome};

    #[test]
    fn rendered_report_parses_with_default_patterns() {
        let ap = ActiveAccessPoint {
            ssid: "CafeWifi".into(),
            bssid: "AA:BB:CC:DD:EE:FF".into(),
        };
        let report = render_report("wlan0", Some(&ap));
        assert!(report.starts_with("    Name                   : wlan0\n"));
        assert_eq!(
            parse_status(&report, &StatusPatterns::default()),
            ProbeOutcome::Connected(NetworkIdentity::new(Some("CafeWifi"), "AA:BB:CC:DD:EE:FF"))
        );
    }

    #[test]
    fn hidden_network_renders_without_name() {
        let ap = ActiveAccessPoint {
            ssid: String::new(),
            bssid: "00:11:22:33:44:55".into(),
        };
        let report = render_report("wlp2s0", Some(&ap));
        assert_eq!(
            parse_status(&report, &StatusPatterns::default()),
            ProbeOutcome::Connected(NetworkIdentity::new(None, "00:11:22:33:44:55"))
        );
    }

    #[test]
    fn unassociated_device_is_disconnected() {
        let report = render_report("wlan0", None);
        assert!(report.contains("disconnected"));
        assert_eq!(
            parse_status(&report, &StatusPatterns::default()),
            ProbeOutcome::Disconnected
        );
    }
}
