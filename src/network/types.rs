use std::fmt;

/// The wireless network the machine is currently associated with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    /// SSID, when the status report carries a non-empty one
    pub display_name: Option<String>,
    /// BSSID of the associated access point; the policy store key
    pub stable_id: String,
}

impl NetworkIdentity {
    pub fn new(display_name: Option<&str>, stable_id: &str) -> Self {
        Self {
            display_name: display_name.map(str::to_string),
            stable_id: stable_id.to_string(),
        }
    }

    /// Name shown to the operator, falling back to a generic label
    pub fn label<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(fallback)
    }
}

impl fmt::Display for NetworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "\"{}\" ({})", name, self.stable_id),
            None => write!(f, "{}", self.stable_id),
        }
    }
}

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Connected(NetworkIdentity),
    /// No adapter, adapter off, not associated, or an unparseable report
    Disconnected,
}

impl ProbeOutcome {
    pub fn stable_id(&self) -> Option<&str> {
        match self {
            Self::Connected(identity) => Some(&identity.stable_id),
            Self::Disconnected => None,
        }
    }
}
