use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for wifi-proxy
#[derive(Error, Debug)]
pub enum ProxyError {
    #[cfg(target_os = "linux")]
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    #[error("Policy store {} is corrupt: {source}", path.display())]
    StoreCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to apply proxy settings: {0}")]
    ApplyFailed(String),

    #[error("Network status query failed: {0}")]
    Probe(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Invalid status pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Login startup registration failed: {0}")]
    Autostart(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl ProxyError {
    /// Fold any failure raised while touching the OS proxy settings into
    /// `ApplyFailed`, keeping the original message.
    pub fn into_apply_failure(self) -> Self {
        match self {
            Self::ApplyFailed(_) => self,
            other => Self::ApplyFailed(other.to_string()),
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
