use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::probe::NetworkStatusSource;
use crate::error::{ProxyError, ProxyResult};

/// Hides the console window a child process would otherwise flash up
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Status text from an external command, `netsh wlan show interfaces` by
/// default.
#[derive(Debug, Clone)]
pub struct CommandStatusSource {
    program: String,
    args: Vec<String>,
}

impl CommandStatusSource {
    pub fn new(argv: &[String]) -> ProxyResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ProxyError::Probe("status command is empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl NetworkStatusSource for CommandStatusSource {
    async fn status_text(&self) -> ProxyResult<String> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let output = command
            .output()
            .await
            .map_err(|e| ProxyError::Probe(format!("failed to run {}: {}", self.program, e)))?;

        // "no wireless interface" exits non-zero; its text parses as disconnected
        if !output.status.success() {
            debug!(
                program = %self.program,
                status = %output.status,
                "Status command exited unsuccessfully"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
