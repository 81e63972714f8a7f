// D-Bus proxy trait definitions for the NetworkManager interfaces the probe
// and the change monitor read. zbus's #[proxy] macro generates typed async
// clients, including `receive_*` streams for signals and property changes.

use zbus::proxy;
use zbus::zvariant::OwnedObjectPath;

// ── NetworkManager Main Interface ─────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
pub trait NetworkManager {
    /// Get all network devices
    fn get_devices(&self) -> zbus::Result<Vec<OwnedObjectPath>>;

    /// NetworkManager version
    #[zbus(property)]
    fn version(&self) -> zbus::Result<String>;
}

// ── Device Interface ──────────────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager.Device",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait Device {
    /// Device interface name (e.g., "wlan0")
    #[zbus(property)]
    fn interface(&self) -> zbus::Result<String>;

    /// Device type (2 = Wi-Fi)
    #[zbus(property)]
    fn device_type(&self) -> zbus::Result<u32>;

    /// Signal: the device moved between NMDeviceState values.
    /// The `State` property is left out so its change stream does not clash
    /// with this signal's generated `receive_state_changed`.
    #[zbus(signal)]
    fn state_changed(&self, new_state: u32, old_state: u32, reason: u32) -> zbus::Result<()>;
}

// ── Wireless Device Interface ─────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager.Device.Wireless",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait Wireless {
    /// Active access point ("/" when not associated)
    #[zbus(property)]
    fn active_access_point(&self) -> zbus::Result<OwnedObjectPath>;
}

// ── Access Point Interface ────────────────────────────────────────────

#[proxy(
    interface = "org.freedesktop.NetworkManager.AccessPoint",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait AccessPoint {
    /// SSID as bytes
    #[zbus(property)]
    fn ssid(&self) -> zbus::Result<Vec<u8>>;

    /// BSSID (MAC address string)
    #[zbus(property)]
    fn hw_address(&self) -> zbus::Result<String>;
}
