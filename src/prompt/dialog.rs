use std::process::{Command, Output};

use tracing::debug;

use super::{normalize_answer, prompt_message, Resolver};
use crate::error::{ProxyError, ProxyResult};

/// Exit status zenity uses for Cancel and for closing the window
#[cfg(not(windows))]
const ZENITY_CANCELLED: i32 = 1;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Modal desktop dialog with a single text field: zenity on Linux, a
/// Visual Basic `InputBox` driven through PowerShell on Windows.
#[derive(Debug, Clone)]
pub struct DialogResolver {
    title: String,
}

impl DialogResolver {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }
}

impl Resolver for DialogResolver {
    fn prompt(&mut self, label: &str) -> ProxyResult<Option<String>> {
        let message = prompt_message(label);
        let mut command = dialog_command(&self.title, &message);
        debug!(?command, "Showing proxy dialog");

        let output = command
            .output()
            .map_err(|e| ProxyError::Prompt(format!("failed to open dialog: {e}")))?;
        interpret(&output)
    }
}

#[cfg(not(windows))]
fn dialog_command(title: &str, message: &str) -> Command {
    let mut command = Command::new("zenity");
    command
        .arg("--entry")
        .arg(format!("--title={title}"))
        .arg(format!("--text={message}"));
    command
}

#[cfg(windows)]
fn dialog_command(title: &str, message: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let script = format!(
        "Add-Type -AssemblyName Microsoft.VisualBasic; \
         [Microsoft.VisualBasic.Interaction]::InputBox('{}', '{}')",
        powershell_quote(message),
        powershell_quote(title)
    );
    let mut command = Command::new("powershell");
    command
        .args(["-NoProfile", "-Command", &script])
        .creation_flags(CREATE_NO_WINDOW);
    command
}

/// Escape for a single-quoted PowerShell string
#[cfg_attr(not(windows), allow(dead_code))]
fn powershell_quote(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(not(windows))]
fn interpret(output: &Output) -> ProxyResult<Option<String>> {
    match output.status.code() {
        Some(0) => Ok(normalize_answer(&String::from_utf8_lossy(&output.stdout))),
        Some(ZENITY_CANCELLED) => Ok(None),
        _ => Err(ProxyError::Prompt(format!(
            "dialog exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
    }
}

// InputBox returns an empty string for Cancel, which is a blank answer
#[cfg(windows)]
fn interpret(output: &Output) -> ProxyResult<Option<String>> {
    if !output.status.success() {
        return Err(ProxyError::Prompt(format!(
            "dialog exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(normalize_answer(&String::from_utf8_lossy(&output.stdout)))
}
