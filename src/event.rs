use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Why the monitor woke the engine up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Monitoring just started
    Startup,
    /// A Wi-Fi device changed state (NMDeviceState codes)
    DeviceState { new_state: u32, old_state: u32 },
    /// The associated access point changed without a device state change
    AccessPointChanged,
    /// The status poller saw a different stable identifier
    StatusChanged,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => write!(f, "startup"),
            Self::DeviceState {
                new_state,
                old_state,
            } => write!(f, "device state {old_state} -> {new_state}"),
            Self::AccessPointChanged => write!(f, "access point changed"),
            Self::StatusChanged => write!(f, "status changed"),
        }
    }
}

/// A stream of network change notifications the engine can wait on.
#[async_trait]
pub trait ChangeEventSource: Send {
    /// The next event, or `None` once the source is stopped or every
    /// producer has gone away.
    async fn next_event(&mut self) -> Option<ChangeEvent>;
}

/// Create a subscription and the publisher that feeds it.
///
/// The channel holds one pending event. While the engine is busy (for
/// example blocked on a prompt) further events are dropped, so at most one
/// cycle is queued behind the running one.
pub fn subscription() -> (Subscription, Publisher) {
    let (tx, rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let subscription = Subscription {
        rx,
        stop_rx: stop_rx.clone(),
        stop_tx,
    };
    let publisher = Publisher { tx, stop: stop_rx };
    (subscription, publisher)
}

/// Receiving end of the change events
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
    stop_rx: watch::Receiver<bool>,
    stop_tx: Arc<watch::Sender<bool>>,
}

impl Subscription {
    /// Handle that ends this subscription from anywhere (signal handlers)
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop_tx.clone())
    }
}

#[async_trait]
impl ChangeEventSource for Subscription {
    async fn next_event(&mut self) -> Option<ChangeEvent> {
        loop {
            let stopped = *self.stop_rx.borrow();
            if stopped {
                return None;
            }

            tokio::select! {
                biased;
                changed = self.stop_rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                event = self.rx.recv() => return event,
            }
        }
    }
}

/// Sending end, cloned into every producer task
#[derive(Clone)]
pub struct Publisher {
    tx: mpsc::Sender<ChangeEvent>,
    stop: watch::Receiver<bool>,
}

impl Publisher {
    /// Offer an event. Returns `false` once the subscription is stopped or
    /// dropped, which tells the producer to exit.
    pub fn publish(&self, event: ChangeEvent) -> bool {
        if self.is_stopped() {
            return false;
        }

        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!(%event, "Event dropped, one is already pending");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        let stopped = *self.stop.borrow();
        stopped || self.tx.is_closed()
    }

    /// Resolves once the subscription is stopped or dropped
    pub async fn stopped(&mut self) {
        loop {
            if self.is_stopped() {
                return;
            }

            tokio::select! {
                changed = self.stop.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = self.tx.closed() => return,
            }
        }
    }
}

/// Ends a subscription: pending and future `next_event` calls return `None`
/// and producers see `publish` fail.
#[derive(Clone)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_published_events() {
        let (mut sub, publisher) = subscription();
        assert!(publisher.publish(ChangeEvent::Startup));
        assert_eq!(sub.next_event().await, Some(ChangeEvent::Startup));
    }

    #[tokio::test]
    async fn buffers_at_most_one_pending_event() {
        let (mut sub, publisher) = subscription();
        assert!(publisher.publish(ChangeEvent::StatusChanged));
        assert!(publisher.publish(ChangeEvent::AccessPointChanged));
        assert!(publisher.publish(ChangeEvent::AccessPointChanged));
        drop(publisher);

        assert_eq!(sub.next_event().await, Some(ChangeEvent::StatusChanged));
        assert_eq!(sub.next_event().await, None);
    }

    #[tokio::test]
    async fn stop_ends_the_subscription() {
        let (mut sub, mut publisher) = subscription();
        let handle = sub.stop_handle();

        let waiter = tokio::spawn(async move { sub.next_event().await });
        tokio::task::yield_now().await;
        handle.stop();

        assert_eq!(waiter.await.unwrap(), None);
        assert!(!publisher.publish(ChangeEvent::StatusChanged));
        publisher.stopped().await;
    }

    #[tokio::test]
    async fn dropping_the_subscription_stops_publishers() {
        let (sub, mut publisher) = subscription();
        drop(sub);
        assert!(!publisher.publish(ChangeEvent::Startup));
        publisher.stopped().await;
    }
}
