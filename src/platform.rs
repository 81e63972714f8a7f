//! Picks the OS bindings named in the config: where status comes from, how
//! changes are noticed, which proxy settings get written and how the user
//! is asked.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, MonitorMode, ProbeSource, PromptMode, ProxyBackend};
use crate::error::{ProxyError, ProxyResult};
use crate::event::Publisher;
use crate::network::poll::spawn_status_poller;
use crate::network::{CommandStatusSource, NetworkStatusSource, StatusPatterns};
use crate::prompt::{DialogResolver, Resolver, TerminalResolver};
use crate::proxy::{LogOnlyProxyConfig, ProxyConfigStore};

#[cfg(target_os = "linux")]
use crate::network::{signals::start_signal_listener, NetworkManager, NmStatusSource};

/// The status source plus, on Linux, the NetworkManager connection behind
/// it so the monitor can reuse it.
pub struct StatusBackend {
    pub source: Arc<dyn NetworkStatusSource>,
    #[cfg(target_os = "linux")]
    nm: Option<NetworkManager>,
}

impl StatusBackend {
    fn command(config: &Config) -> ProxyResult<Self> {
        Ok(Self {
            source: Arc::new(CommandStatusSource::new(&config.probe.command)?),
            #[cfg(target_os = "linux")]
            nm: None,
        })
    }
}

pub async fn status_backend(config: &Config) -> ProxyResult<StatusBackend> {
    match config.probe.source {
        ProbeSource::Command => StatusBackend::command(config),
        #[cfg(target_os = "linux")]
        ProbeSource::NetworkManager => {
            let nm = NetworkManager::new().await?;
            Ok(nm_backend(nm).await)
        }
        #[cfg(target_os = "linux")]
        ProbeSource::Auto => match NetworkManager::new().await {
            Ok(nm) => Ok(nm_backend(nm).await),
            Err(e) => {
                warn!("NetworkManager unavailable ({}), using the status command", e);
                StatusBackend::command(config)
            }
        },
        #[cfg(not(target_os = "linux"))]
        ProbeSource::NetworkManager => Err(ProxyError::NotSupported(
            "NetworkManager is only available on Linux".into(),
        )),
        #[cfg(not(target_os = "linux"))]
        ProbeSource::Auto => StatusBackend::command(config),
    }
}

#[cfg(target_os = "linux")]
async fn nm_backend(nm: NetworkManager) -> StatusBackend {
    match nm.version().await {
        Ok(version) => info!("Connected to NetworkManager v{}", version),
        Err(e) => warn!("Could not read NetworkManager version: {}", e),
    }
    StatusBackend {
        source: Arc::new(NmStatusSource::new(nm.clone())),
        nm: Some(nm),
    }
}

/// Start whatever feeds `publisher` with change notifications.
pub async fn start_monitor(
    config: &Config,
    status: &StatusBackend,
    patterns: StatusPatterns,
    publisher: Publisher,
) -> ProxyResult<()> {
    let poll = |publisher| {
        info!(interval = ?config.poll_interval(), "Watching for network changes by polling");
        spawn_status_poller(
            status.source.clone(),
            patterns.clone(),
            config.poll_interval(),
            publisher,
        );
    };

    match config.monitor.mode {
        MonitorMode::Poll => {
            poll(publisher);
            Ok(())
        }
        #[cfg(target_os = "linux")]
        MonitorMode::NetworkManager => {
            let nm = match &status.nm {
                Some(nm) => nm.clone(),
                None => NetworkManager::new().await?,
            };
            if start_signal_listener(&nm, publisher).await? {
                info!("Watching NetworkManager signals");
                Ok(())
            } else {
                Err(ProxyError::NotSupported(
                    "NetworkManager reports no Wi-Fi device".into(),
                ))
            }
        }
        #[cfg(target_os = "linux")]
        MonitorMode::Auto => {
            if let Some(nm) = &status.nm {
                match start_signal_listener(nm, publisher.clone()).await {
                    Ok(true) => {
                        info!("Watching NetworkManager signals");
                        return Ok(());
                    }
                    Ok(false) => warn!("No Wi-Fi device to watch, falling back to polling"),
                    Err(e) => warn!("Signal listener failed ({}), falling back to polling", e),
                }
            }
            poll(publisher);
            Ok(())
        }
        #[cfg(not(target_os = "linux"))]
        MonitorMode::NetworkManager => Err(ProxyError::NotSupported(
            "NetworkManager is only available on Linux".into(),
        )),
        #[cfg(not(target_os = "linux"))]
        MonitorMode::Auto => {
            poll(publisher);
            Ok(())
        }
    }
}

pub fn proxy_store(config: &Config) -> ProxyResult<Arc<dyn ProxyConfigStore>> {
    match config.proxy.backend {
        ProxyBackend::Log => Ok(Arc::new(LogOnlyProxyConfig)),
        ProxyBackend::Gsettings => Ok(Arc::new(crate::proxy::GsettingsProxyConfig::default())),
        #[cfg(windows)]
        ProxyBackend::WinInet | ProxyBackend::Auto => {
            Ok(Arc::new(crate::proxy::WinInetProxyConfig))
        }
        #[cfg(not(windows))]
        ProxyBackend::WinInet => Err(ProxyError::NotSupported(
            "WinInet proxy settings exist only on Windows".into(),
        )),
        #[cfg(target_os = "linux")]
        ProxyBackend::Auto => Ok(Arc::new(crate::proxy::GsettingsProxyConfig::default())),
        #[cfg(not(any(windows, target_os = "linux")))]
        ProxyBackend::Auto => Err(ProxyError::NotSupported(
            "no system proxy backend for this platform; set [proxy] backend".into(),
        )),
    }
}

pub fn resolver(config: &Config) -> Box<dyn Resolver> {
    match config.prompt.mode {
        PromptMode::Dialog => Box::new(DialogResolver::new(&config.prompt.title)),
        PromptMode::Terminal => Box::new(TerminalResolver::new(&config.prompt.title)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn log_backend_is_available_everywhere() {
        assert!(proxy_store(&config("[proxy]\nbackend = \"log\"\n")).is_ok());
    }

    #[cfg(not(windows))]
    #[test]
    fn wininet_is_rejected_off_windows() {
        let err = proxy_store(&config("[proxy]\nbackend = \"wininet\"\n")).err().unwrap();
        assert!(matches!(err, ProxyError::NotSupported(_)));
    }

    #[tokio::test]
    async fn command_source_needs_a_program() {
        let cfg = config("[probe]\nsource = \"command\"\ncommand = []\n");
        assert!(matches!(
            status_backend(&cfg).await.err().unwrap(),
            ProxyError::Probe(_)
        ));
    }

    #[tokio::test]
    async fn poll_mode_starts_without_networkmanager() {
        let cfg = config("[probe]\nsource = \"command\"\ncommand = [\"true\"]\n[monitor]\nmode = \"poll\"\n");
        let status = status_backend(&cfg).await.unwrap();
        let (_subscription, publisher) = crate::event::subscription();
        start_monitor(&cfg, &status, StatusPatterns::default(), publisher)
            .await
            .unwrap();
    }
}
