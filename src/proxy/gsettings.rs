use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{ProxyConfigStore, ReloadSignal};
use crate::error::{ProxyError, ProxyResult};

const PROXY_SCHEMA: &str = "org.gnome.system.proxy";
const SERVER_SCHEMAS: [&str; 2] = ["org.gnome.system.proxy.http", "org.gnome.system.proxy.https"];

/// GNOME desktop proxy settings, written through the `gsettings` tool.
///
/// The endpoint is split into host and port because that is how the schema
/// stores it; an endpoint without a numeric port is rejected.
#[derive(Debug, Clone)]
pub struct GsettingsProxyConfig {
    program: String,
}

impl Default for GsettingsProxyConfig {
    fn default() -> Self {
        Self {
            program: "gsettings".into(),
        }
    }
}

impl GsettingsProxyConfig {
    async fn set(&self, schema: &str, key: &str, value: &str) -> ProxyResult<()> {
        trace!(schema, key, value, "gsettings set");
        let output = Command::new(&self.program)
            .args(["set", schema, key, value])
            .output()
            .await
            .map_err(|e| ProxyError::ApplyFailed(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(ProxyError::ApplyFailed(format!(
                "gsettings set {} {} failed: {}",
                schema,
                key,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ProxyConfigStore for GsettingsProxyConfig {
    fn check_endpoint(&self, endpoint: &str) -> ProxyResult<()> {
        split_endpoint(endpoint).map(|_| ())
    }

    async fn set_enabled(&self, enabled: bool) -> ProxyResult<()> {
        let mode = if enabled { "'manual'" } else { "'none'" };
        self.set(PROXY_SCHEMA, "mode", mode).await
    }

    async fn set_server(&self, endpoint: &str) -> ProxyResult<()> {
        let (host, port) = split_endpoint(endpoint)?;
        let host = format!("'{}'", host.replace('\'', ""));
        let port = port.to_string();
        for schema in SERVER_SCHEMAS {
            self.set(schema, "host", &host).await?;
            self.set(schema, "port", &port).await?;
        }
        Ok(())
    }

    async fn notify(&self, signal: ReloadSignal) -> ProxyResult<()> {
        // dconf broadcasts every write to running clients on its own
        debug!(%signal, "gsettings needs no reload notification");
        Ok(())
    }
}

/// Split `host:port`, accepting `[v6]:port`
fn split_endpoint(endpoint: &str) -> ProxyResult<(&str, u16)> {
    let malformed = || ProxyError::ApplyFailed(format!("proxy endpoint {endpoint:?} is not host:port"));

    let (host, port) = endpoint.trim().rsplit_once(':').ok_or_else(malformed)?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port: u16 = port.parse().map_err(|_| malformed())?;
    if host.is_empty() || port == 0 {
        return Err(malformed());
    }
    Ok((host, port))
}
