//! In-memory stand-ins for the OS integration points, shared by the unit
//! tests of every module.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ProxyError, ProxyResult};
use crate::event::{ChangeEvent, ChangeEventSource};
use crate::network::NetworkStatusSource;
use crate::prompt::Resolver;
use crate::proxy::{ProxyConfigStore, ReloadSignal};

/// Status source returning whatever text it was last given
#[derive(Debug, Default)]
pub struct FakeStatus {
    text: Mutex<String>,
    queries: AtomicUsize,
    fail_next: AtomicBool,
    always_fail: bool,
}

impl FakeStatus {
    pub fn new(text: &str) -> Self {
        Self {
            text: Mutex::new(text.to_string()),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Default::default()
        }
    }

    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    /// Make only the next query fail
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkStatusSource for FakeStatus {
    async fn status_text(&self) -> ProxyResult<String> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.always_fail || self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ProxyError::Probe("scripted failure".into()));
        }
        Ok(self.text.lock().unwrap().clone())
    }
}

/// One write against the proxy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCall {
    Enabled(bool),
    Server(String),
    Notify(ReloadSignal),
}

/// Proxy configuration that records writes, optionally rejecting them all
#[derive(Debug, Default)]
pub struct RecordingProxyConfig {
    calls: Mutex<Vec<ConfigCall>>,
    reject: bool,
}

impl RecordingProxyConfig {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<ConfigCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ConfigCall) -> ProxyResult<()> {
        if self.reject {
            return Err(ProxyError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "access denied",
            )));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl ProxyConfigStore for RecordingProxyConfig {
    async fn set_enabled(&self, enabled: bool) -> ProxyResult<()> {
        self.record(ConfigCall::Enabled(enabled))
    }

    async fn set_server(&self, endpoint: &str) -> ProxyResult<()> {
        self.record(ConfigCall::Server(endpoint.to_string()))
    }

    async fn notify(&self, signal: ReloadSignal) -> ProxyResult<()> {
        self.record(ConfigCall::Notify(signal))
    }
}

/// Resolver answering from a script. Clones share the script and the log
/// of labels, so a test can keep one clone after boxing the other.
/// Every call counts as a prompt; running out of answers is a prompt
/// failure.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResolver {
    answers: Arc<Mutex<VecDeque<Option<String>>>>,
    labels: Arc<Mutex<Vec<String>>>,
}

impl ScriptedResolver {
    pub fn new(answers: Vec<Option<&str>>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(
                answers.into_iter().map(|a| a.map(str::to_string)).collect(),
            )),
            labels: Arc::default(),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> usize {
        self.labels.lock().unwrap().len()
    }
}

impl Resolver for ScriptedResolver {
    fn prompt(&mut self, label: &str) -> ProxyResult<Option<String>> {
        self.labels.lock().unwrap().push(label.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProxyError::Prompt("no scripted answer".into()))
    }
}

/// Event source replaying a fixed list, then ending
#[derive(Debug, Default)]
pub struct ScriptedEvents {
    events: VecDeque<ChangeEvent>,
}

impl ScriptedEvents {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

#[async_trait]
impl ChangeEventSource for ScriptedEvents {
    async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.pop_front()
    }
}
