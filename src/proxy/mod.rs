pub mod gsettings;
#[cfg(windows)]
pub mod wininet;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ProxyError, ProxyResult};
use crate::policy::ProxyPolicy;

pub use gsettings::GsettingsProxyConfig;
#[cfg(windows)]
pub use wininet::WinInetProxyConfig;

/// The two notifications that make running clients reload proxy settings.
/// Both are sent, in this order, after every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSignal {
    SettingsChanged,
    Refresh,
}

impl fmt::Display for ReloadSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SettingsChanged => write!(f, "settings-changed"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// The OS proxy configuration surface: an enable flag, a server string and
/// a reload notification.
#[async_trait]
pub trait ProxyConfigStore: Send + Sync {
    /// Reject an endpoint this store cannot hold, before anything is written
    fn check_endpoint(&self, _endpoint: &str) -> ProxyResult<()> {
        Ok(())
    }

    async fn set_enabled(&self, enabled: bool) -> ProxyResult<()>;

    async fn set_server(&self, endpoint: &str) -> ProxyResult<()>;

    async fn notify(&self, signal: ReloadSignal) -> ProxyResult<()>;
}

/// Turns a resolved policy into writes on a `ProxyConfigStore`.
///
/// Every failure comes back as `ProxyError::ApplyFailed`. Nothing is retried.
#[derive(Clone)]
pub struct ProxyApplier {
    store: Arc<dyn ProxyConfigStore>,
}

impl ProxyApplier {
    pub fn new(store: Arc<dyn ProxyConfigStore>) -> Self {
        Self { store }
    }

    /// Route traffic through `endpoint`, passed through verbatim
    pub async fn enable(&self, endpoint: &str) -> ProxyResult<()> {
        self.write_enabled(endpoint)
            .await
            .map_err(ProxyError::into_apply_failure)?;
        info!(endpoint, "System proxy enabled");
        Ok(())
    }

    pub async fn disable(&self) -> ProxyResult<()> {
        self.write_disabled()
            .await
            .map_err(ProxyError::into_apply_failure)?;
        info!("System proxy disabled");
        Ok(())
    }

    pub async fn apply(&self, policy: &ProxyPolicy) -> ProxyResult<()> {
        match policy {
            ProxyPolicy::UseProxy(endpoint) => self.enable(endpoint).await,
            ProxyPolicy::NoProxy => self.disable().await,
            ProxyPolicy::NoPolicyRecorded => {
                debug!("No policy recorded, leaving proxy settings untouched");
                Ok(())
            }
        }
    }

    async fn write_enabled(&self, endpoint: &str) -> ProxyResult<()> {
        self.store.check_endpoint(endpoint)?;
        self.store.set_enabled(true).await?;
        self.store.set_server(endpoint).await?;
        self.reload().await
    }

    async fn write_disabled(&self) -> ProxyResult<()> {
        self.store.set_enabled(false).await?;
        self.reload().await
    }

    async fn reload(&self) -> ProxyResult<()> {
        self.store.notify(ReloadSignal::SettingsChanged).await?;
        self.store.notify(ReloadSignal::Refresh).await
    }
}

/// Dry-run backend: records every write in the log and touches nothing
#[derive(Debug, Default)]
pub struct LogOnlyProxyConfig;

#[async_trait]
impl ProxyConfigStore for LogOnlyProxyConfig {
    async fn set_enabled(&self, enabled: bool) -> ProxyResult<()> {
        info!(enabled, "[dry run] proxy enable flag");
        Ok(())
    }

    async fn set_server(&self, endpoint: &str) -> ProxyResult<()> {
        info!(endpoint, "[dry run] proxy server");
        Ok(())
    }

    async fn notify(&self, signal: ReloadSignal) -> ProxyResult<()> {
        debug!(%signal, "[dry run] reload notification");
        Ok(())
    }
}
