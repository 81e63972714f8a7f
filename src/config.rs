use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use tracing::info;

use crate::engine::EngineConfig;
use crate::network::StatusPatterns;

const APP_DIR: &str = "wifi-proxy";

// ─── Embedded Default ────────────────────────────────────────────────────
/// Baked into the binary at compile time, so a missing config file is never
/// fatal.
const DEFAULT_CONFIG_TOML: &str = include_str!("../default_config.toml");

// ─── CLI Arguments (override layer) ─────────────────────────────────────
/// Switches the system HTTP proxy to match the Wi-Fi network you are on
#[derive(Parser, Debug, Clone)]
#[command(name = "wifi-proxy", version, about, long_about = None)]
pub struct CliArgs {
    /// Path to a custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (overrides config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log file path (overrides config file)
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    /// Also write the log to stderr
    #[arg(long, global = true)]
    pub stderr: bool,

    /// Print the default config to stdout and exit
    #[arg(long)]
    pub print_default_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Watch for network changes and switch the proxy (default)
    Run,
    /// Resolve and apply the proxy for the current network, then exit
    Once,
    /// Show the current network and its stored policy without applying it
    Status,
    /// List every remembered network
    List,
    /// Forget the policy stored for a network, so the next visit prompts again
    Forget {
        /// Stable identifier (BSSID) as shown by `list`
        id: String,
    },
    /// Start automatically at login
    Install,
    /// Stop starting at login
    Uninstall,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

// ─── TOML Structs ───────────────────────────────────────────────────────

/// Root configuration, parsed from TOML and then overridden by CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    /// Empty = `<data dir>/wifi-proxy/wifi-proxy.log`
    pub log_file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Empty = `<config dir>/wifi-proxy/networks.json`
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeSource {
    Auto,
    NetworkManager,
    Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub source: ProbeSource,
    pub command: Vec<String>,
    pub ssid_pattern: String,
    pub bssid_pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    Auto,
    NetworkManager,
    Poll,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub mode: MonitorMode,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    Dialog,
    Terminal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub mode: PromptMode,
    pub title: String,
    pub fallback_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyBackend {
    Auto,
    WinInet,
    Gsettings,
    Log,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub backend: ProxyBackend,
}

// ─── Defaults ───────────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML)
            .expect("BUG: embedded default_config.toml is invalid TOML")
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_file: String::new(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            source: ProbeSource::Auto,
            command: ["netsh", "wlan", "show", "interfaces"]
                .map(String::from)
                .to_vec(),
            ssid_pattern: crate::network::probe::DEFAULT_SSID_PATTERN.into(),
            bssid_pattern: crate::network::probe::DEFAULT_BSSID_PATTERN.into(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: MonitorMode::Auto,
            poll_interval_secs: 2,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            mode: PromptMode::Dialog,
            title: "New Wi-Fi detected".into(),
            fallback_label: "this network".into(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            backend: ProxyBackend::Auto,
        }
    }
}

// ─── Path Resolution ────────────────────────────────────────────────────

impl Config {
    /// Standard config file path: `<config dir>/wifi-proxy/config.toml`
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Log directory: `<data dir>/wifi-proxy/`
    pub fn log_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Log file, either configured or the default in `log_dir()`
    pub fn log_file(&self) -> PathBuf {
        non_empty(&self.general.log_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::log_dir().join("wifi-proxy.log"))
    }

    /// Policy store file, either configured or `<config dir>/wifi-proxy/networks.json`
    pub fn store_path(&self) -> PathBuf {
        non_empty(&self.store.path)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR)
                    .join("networks.json")
            })
    }

    /// Poll interval as Duration, never below one second
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.poll_interval_secs.max(1))
    }

    /// Compile the probe patterns
    pub fn status_patterns(&self) -> Result<StatusPatterns> {
        StatusPatterns::new(&self.probe.ssid_pattern, &self.probe.bssid_pattern)
            .wrap_err("Invalid [probe] pattern")
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig {
            store_path: self.store_path(),
            patterns: self.status_patterns()?,
            fallback_label: self.prompt.fallback_label.clone(),
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s) }
}

// ─── Bootloader ─────────────────────────────────────────────────────────

/// The single entry point for configuration. Called exactly once at startup.
///
/// 1. Resolve config file path (CLI override or default)
/// 2. If config file doesn't exist, create directory tree + write defaults
/// 3. Parse TOML from disk into Config
/// 4. Apply CLI overrides on top
pub fn load(cli: &CliArgs) -> Result<Config> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&config_path, DEFAULT_CONFIG_TOML).wrap_err_with(|| {
            format!(
                "Failed to write default config to {}",
                config_path.display()
            )
        })?;
        info!("Created default config at {}", config_path.display());
    }

    let toml_str = std::fs::read_to_string(&config_path)
        .wrap_err_with(|| format!("Failed to read config from {}", config_path.display()))?;

    let mut config = parse(&toml_str).wrap_err_with(|| {
        format!(
            "Failed to parse config at {}.\n\
             Delete the file to regenerate defaults, or run:\n  \
             wifi-proxy --print-default-config > {:?}",
            config_path.display(),
            config_path
        )
    })?;

    // ── CLI overrides ───────────────────────────────────────────────
    if let Some(ref level) = cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(ref log) = cli.log {
        config.general.log_file = log.display().to_string();
    }

    Ok(config)
}

fn parse(toml_str: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns the embedded default config TOML string.
pub fn default_config_toml() -> &'static str {
    DEFAULT_CONFIG_TOML
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_match_the_struct_defaults() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.probe.source, ProbeSource::Auto);
        assert_eq!(config.probe.command, ProbeConfig::default().command);
        assert_eq!(config.probe.ssid_pattern, ProbeConfig::default().ssid_pattern);
        assert_eq!(config.probe.bssid_pattern, ProbeConfig::default().bssid_pattern);
        assert_eq!(config.monitor.mode, MonitorMode::Auto);
        assert_eq!(config.monitor.poll_interval_secs, 2);
        assert_eq!(config.prompt.mode, PromptMode::Dialog);
        assert_eq!(config.prompt.fallback_label, "this network");
        assert_eq!(config.proxy.backend, ProxyBackend::Auto);
        assert!(config.status_patterns().is_ok());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = parse("[proxy]\nbackend = \"log\"\n").unwrap();
        assert_eq!(config.proxy.backend, ProxyBackend::Log);
        assert_eq!(config.prompt.title, "New Wi-Fi detected");
        assert_eq!(config.monitor.poll_interval_secs, 2);
    }

    #[test]
    fn unknown_modes_are_rejected() {
        assert!(parse("[monitor]\nmode = \"inotify\"\n").is_err());
        assert!(parse("[proxy]\nbackend = \"pac\"\n").is_err());
    }

    #[test]
    fn explicit_paths_win_over_defaults() {
        let config = parse("[store]\npath = \"/tmp/nets.json\"\n[general]\nlog_file = \" \"\n").unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/tmp/nets.json"));
        assert!(config.log_file().ends_with("wifi-proxy.log"));
        assert!(Config::default().store_path().ends_with("wifi-proxy/networks.json"));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config = parse("[monitor]\npoll_interval_secs = 0\n").unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn bad_pattern_is_reported() {
        let config = parse("[probe]\nbssid_pattern = \"(unclosed\"\n").unwrap();
        assert!(config.engine_config().is_err());
    }

    #[test]
    fn cli_defaults_to_run_and_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cli = CliArgs::parse_from([
            "wifi-proxy",
            "--config",
            path.to_str().unwrap(),
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.command(), Command::Run);

        let config = load(&cli).unwrap();
        assert!(path.exists(), "first run writes the defaults");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), default_config_toml());
    }

    #[test]
    fn forget_takes_an_identifier() {
        let cli = CliArgs::parse_from(["wifi-proxy", "forget", "aa:bb:cc:dd:ee:ff", "--stderr"]);
        assert_eq!(
            cli.command(),
            Command::Forget {
                id: "aa:bb:cc:dd:ee:ff".into()
            }
        );
        assert!(cli.stderr);
    }
}
