//! Start at login: a Task Scheduler logon task on Windows, an XDG autostart
//! entry elsewhere.

use std::path::Path;

use tracing::info;

use crate::error::{ProxyError, ProxyResult};

/// Name of the logon task / autostart entry
pub const TASK_NAME: &str = "Proxy WiFi Switch";

/// Register `exe run` to start at login. Returns where it was registered.
pub async fn install() -> ProxyResult<String> {
    let exe = std::env::current_exe()?;
    platform::install(&exe).await
}

/// Remove the login registration. Returns `false` if there was none.
pub async fn uninstall() -> ProxyResult<bool> {
    platform::uninstall().await
}

#[cfg(windows)]
mod platform {
    use std::os::windows::process::CommandExt;
    use std::path::Path;

    use tokio::process::Command;
    use tracing::debug;

    use super::{info, tool_failed, TASK_NAME};
    use crate::error::ProxyResult;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    async fn schtasks(args: &[&str]) -> ProxyResult<std::process::Output> {
        debug!(?args, "Running schtasks");
        let mut command = Command::new("schtasks");
        command.args(args).creation_flags(CREATE_NO_WINDOW);
        Ok(command.output().await?)
    }

    pub async fn install(exe: &Path) -> ProxyResult<String> {
        let action = format!("\"{}\" run", exe.display());
        let output = schtasks(&[
            "/Create", "/F", "/SC", "ONLOGON", "/RL", "LIMITED", "/TN", TASK_NAME, "/TR", &action,
        ])
        .await?;
        if !output.status.success() {
            return Err(tool_failed("schtasks", &output.stderr));
        }
        info!(task = TASK_NAME, "Installed logon task");
        Ok(format!("scheduled task \"{TASK_NAME}\""))
    }

    pub async fn uninstall() -> ProxyResult<bool> {
        let output = schtasks(&["/Delete", "/F", "/TN", TASK_NAME]).await?;
        if output.status.success() {
            info!(task = TASK_NAME, "Removed logon task");
        }
        Ok(output.status.success())
    }
}

#[cfg(not(windows))]
mod platform {
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::{desktop_entry, info};
    use crate::error::{ProxyError, ProxyResult};

    fn entry_path() -> ProxyResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("autostart").join("wifi-proxy.desktop"))
            .ok_or_else(|| ProxyError::Autostart("no config directory for autostart".into()))
    }

    pub async fn install(exe: &Path) -> ProxyResult<String> {
        let path = entry_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, desktop_entry(exe))?;
        info!(path = %path.display(), "Installed autostart entry");
        Ok(path.display().to_string())
    }

    pub async fn uninstall() -> ProxyResult<bool> {
        let path = entry_path()?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed autostart entry");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Error for a registration tool that exited unsuccessfully
#[cfg_attr(not(windows), allow(dead_code))]
fn tool_failed(tool: &str, stderr: &[u8]) -> ProxyError {
    ProxyError::Autostart(format!(
        "{tool} failed: {}",
        String::from_utf8_lossy(stderr).trim()
    ))
}

/// XDG autostart entry launching `exe run` without a terminal window.
/// `Hidden=true` would mean "deleted" to the session manager, so the entry
/// only hides itself from menus.
#[cfg_attr(windows, allow(dead_code))]
fn desktop_entry(exe: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={TASK_NAME}\n\
         Comment=Switch the HTTP proxy to match the Wi-Fi network\n\
         Exec={} run\n\
         Terminal=false\n\
         NoDisplay=true\n\
         X-GNOME-Autostart-enabled=true\n",
        exec_quote(&exe.to_string_lossy())
    )
}

/// Quote one `Exec` argument per the desktop entry rules
#[cfg_attr(windows, allow(dead_code))]
fn exec_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+".contains(c));
    if plain {
        return arg.to_string();
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn entry_runs_the_monitor_without_a_terminal() {
        let entry = desktop_entry(&PathBuf::from("/usr/bin/wifi-proxy"));
        assert!(entry.starts_with("[Desktop Entry]\n"));
        assert!(entry.contains("\nExec=/usr/bin/wifi-proxy run\n"));
        assert!(entry.contains("\nTerminal=false\n"));
        assert!(entry.contains("\nNoDisplay=true\n"));
        assert!(!entry.contains("Hidden="));
    }

    #[test]
    fn failed_registration_names_the_tool_and_its_output() {
        let err = tool_failed("schtasks", b"ERROR: Access is denied.\r\n");
        assert!(matches!(err, ProxyError::Autostart(_)), "{err:?}");
        assert_eq!(
            err.to_string(),
            "Login startup registration failed: schtasks failed: ERROR: Access is denied."
        );
    }

    #[test]
    fn exec_paths_with_spaces_and_specials_are_quoted() {
        assert_eq!(exec_quote("/opt/my apps/wp"), "\"/opt/my apps/wp\"");
        assert_eq!(exec_quote("/home/$USER/wp"), "\"/home/\\$USER/wp\"");
        assert_eq!(exec_quote(""), "\"\"");
    }
}
