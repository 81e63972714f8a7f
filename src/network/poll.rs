use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::probe::{probe, NetworkStatusSource, StatusPatterns};
use crate::event::{ChangeEvent, Publisher};

/// Re-probe on a fixed interval and publish `StatusChanged` whenever the
/// stable identifier differs from the previous poll. The first poll only
/// records a baseline.
///
/// Used where no change notification is available from the OS.
pub fn spawn_status_poller(
    source: Arc<dyn NetworkStatusSource>,
    patterns: StatusPatterns,
    interval: Duration,
    mut publisher: Publisher,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(?interval, "Starting status poller");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen: Option<Option<String>> = None;

        loop {
            tokio::select! {
                _ = publisher.stopped() => break,
                _ = ticker.tick() => {}
            }

            let current = match probe(source.as_ref(), &patterns).await {
                Ok(outcome) => outcome.stable_id().map(str::to_string),
                Err(e) => {
                    debug!("Status poll failed: {}", e);
                    continue;
                }
            };

            if let Some(previous) = &last_seen {
                if *previous != current {
                    debug!(?previous, ?current, "Stable identifier changed");
                    if !publisher.publish(ChangeEvent::StatusChanged) {
                        break;
                    }
                }
            }
            last_seen = Some(current);
        }

        debug!("Status poller stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{subscription, ChangeEventSource};
    use crate::testing::FakeStatus;

    const HOME: &str = "    SSID : Home\n    BSSID : 00:11:22:33:44:55\n";
    const CAFE: &str = "    SSID : CafeWifi\n    BSSID : aa:bb:cc:dd:ee:ff\n";

    #[tokio::test(start_paused = true)]
    async fn publishes_when_the_access_point_changes() {
        let status = Arc::new(FakeStatus::new(HOME));
        let (mut sub, publisher) = subscription();
        let poller = spawn_status_poller(
            status.clone(),
            StatusPatterns::default(),
            Duration::from_secs(1),
            publisher,
        );

        // Baseline plus one unchanged poll
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(status.queries() >= 2);

        status.set_text(CAFE);
        let event = tokio::time::timeout(Duration::from_secs(5), sub.next_event())
            .await
            .expect("poller should notice the new access point");
        assert_eq!(event, Some(ChangeEvent::StatusChanged));

        sub.stop_handle().stop();
        poller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_network_publishes_nothing() {
        let status = Arc::new(FakeStatus::new(HOME));
        let (mut sub, publisher) = subscription();
        let poller = spawn_status_poller(
            status.clone(),
            StatusPatterns::default(),
            Duration::from_secs(1),
            publisher,
        );

        let waited = tokio::time::timeout(Duration::from_secs(10), sub.next_event()).await;
        assert!(waited.is_err());
        assert!(status.queries() >= 10);

        sub.stop_handle().stop();
        poller.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_counts_as_a_change() {
        let status = Arc::new(FakeStatus::new(HOME));
        let (mut sub, publisher) = subscription();
        let poller = spawn_status_poller(
            status.clone(),
            StatusPatterns::default(),
            Duration::from_secs(1),
            publisher,
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        status.set_text("    State : disconnected\n");
        let event = tokio::time::timeout(Duration::from_secs(5), sub.next_event())
            .await
            .unwrap();
        assert_eq!(event, Some(ChangeEvent::StatusChanged));

        drop(sub);
        poller.await.unwrap();
    }
}
