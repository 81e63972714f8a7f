pub mod command;
pub mod poll;
pub mod probe;
pub mod types;

#[cfg(target_os = "linux")]
pub mod dbus_proxies;
#[cfg(target_os = "linux")]
pub mod manager;
#[cfg(target_os = "linux")]
pub mod signals;

pub use command::CommandStatusSource;
pub use probe::{probe, NetworkStatusSource, StatusPatterns};
pub use types::*;

#[cfg(target_os = "linux")]
pub use manager::{NetworkManager, NmStatusSource};
