use futures::StreamExt;
use tracing::{debug, warn};
use zbus::zvariant::OwnedObjectPath;

use super::dbus_proxies::{DeviceProxy, WirelessProxy};
use super::manager::NetworkManager;
use crate::error::ProxyResult;
use crate::event::{ChangeEvent, Publisher};

/// Forward NetworkManager notifications for the first Wi-Fi device to
/// `publisher`: every device `StateChanged` signal, plus changes of the
/// `ActiveAccessPoint` property (roaming between access points that share
/// a name changes the BSSID without a device state change).
///
/// Returns `false` when there is no Wi-Fi device to watch.
pub async fn start_signal_listener(nm: &NetworkManager, publisher: Publisher) -> ProxyResult<bool> {
    let device = match nm.find_wifi_device().await? {
        Some(device) => device,
        None => return Ok(false),
    };
    debug!("Starting NetworkManager signal listener on {}", device);

    let dev_proxy: DeviceProxy<'static> = DeviceProxy::builder(nm.connection())
        .path(device.clone())?
        .build()
        .await?;
    let wireless: WirelessProxy<'static> = WirelessProxy::builder(nm.connection())
        .path(device)?
        .build()
        .await?;

    let mut state_changes = dev_proxy.receive_state_changed().await?;
    let mut state_publisher = publisher.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = state_publisher.stopped() => break,
                signal = state_changes.next() => {
                    let Some(signal) = signal else { break };
                    let args = match signal.args() {
                        Ok(args) => args,
                        Err(e) => {
                            warn!("Malformed StateChanged signal: {}", e);
                            continue;
                        }
                    };
                    let event = ChangeEvent::DeviceState {
                        new_state: *args.new_state(),
                        old_state: *args.old_state(),
                    };
                    if !state_publisher.publish(event) {
                        break;
                    }
                }
            }
        }
        debug!("Device state listener stopped");
    });

    let mut last_ap: Option<OwnedObjectPath> = wireless.active_access_point().await.ok();
    let mut ap_changes = wireless.receive_active_access_point_changed().await;
    let mut ap_publisher = publisher;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = ap_publisher.stopped() => break,
                change = ap_changes.next() => {
                    let Some(change) = change else { break };
                    let path = match change.get().await {
                        Ok(path) => path,
                        Err(e) => {
                            warn!("Failed to read ActiveAccessPoint change: {}", e);
                            continue;
                        }
                    };
                    if last_ap.as_ref() == Some(&path) {
                        continue;
                    }
                    debug!("Active access point is now {}", path);
                    last_ap = Some(path);
                    if !ap_publisher.publish(ChangeEvent::AccessPointChanged) {
                        break;
                    }
                }
            }
        }
        debug!("Access point listener stopped");
    });

    debug!("Signal listeners started");
    Ok(true)
}
