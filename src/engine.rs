//! The resolution engine: one cycle per network change.
//!
//! ```text
//! Idle → Probing ─ Disconnected ──────────────────────────────→ Idle
//!                └ Resolving ─ hit ──────────→ Applying ──────→ Idle
//!                            └ miss → Prompting → Applying → Persisting → Idle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::{ProxyError, ProxyResult};
use crate::event::ChangeEventSource;
use crate::network::{probe, NetworkIdentity, NetworkStatusSource, ProbeOutcome, StatusPatterns};
use crate::policy::{lookup, PolicyStore, ProxyPolicy};
use crate::prompt::Resolver;
use crate::proxy::ProxyApplier;

/// Everything the engine would otherwise read from globals
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub store_path: PathBuf,
    pub patterns: StatusPatterns,
    /// Shown in the prompt when the network has no name
    pub fallback_label: String,
}

/// Where the applied policy came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Found in the store; no prompt, no write
    Stored,
    /// Asked for and persisted during this cycle
    Learned,
}

/// What one completed cycle did
#[derive(Debug)]
pub struct CycleReport {
    pub identity: NetworkIdentity,
    pub policy: ProxyPolicy,
    pub resolution: Resolution,
    /// Set when the OS rejected the proxy change; a learned policy is still
    /// persisted and gets re-applied on the next event for this network.
    pub apply_error: Option<ProxyError>,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// No wireless association; nothing was read, written or applied
    Disconnected,
    Resolved(CycleReport),
}

pub struct ResolutionEngine {
    status: Arc<dyn NetworkStatusSource>,
    store: PolicyStore,
    applier: ProxyApplier,
    resolver: Box<dyn Resolver>,
    patterns: StatusPatterns,
    fallback_label: String,
}

impl ResolutionEngine {
    pub fn new(
        config: EngineConfig,
        status: Arc<dyn NetworkStatusSource>,
        applier: ProxyApplier,
        resolver: Box<dyn Resolver>,
    ) -> Self {
        Self {
            status,
            store: PolicyStore::new(config.store_path),
            applier,
            resolver,
            patterns: config.patterns,
            fallback_label: config.fallback_label,
        }
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// Run one full cycle: probe, look up, prompt on a miss, apply, persist
    /// on a miss.
    ///
    /// `StoreCorrupt` and probe/prompt failures abort the cycle before
    /// anything is applied. A failed apply does not: it is logged and
    /// returned in the report.
    pub async fn run_cycle(&mut self) -> ProxyResult<CycleOutcome> {
        let identity = match probe(self.status.as_ref(), &self.patterns).await? {
            ProbeOutcome::Connected(identity) => identity,
            ProbeOutcome::Disconnected => {
                debug!("Not associated with a wireless network");
                return Ok(CycleOutcome::Disconnected);
            }
        };
        debug!(network = %identity, "Resolving proxy policy");

        let mut policies = self.store.load()?;

        let (policy, resolution) = match lookup(&policies, &identity.stable_id) {
            ProxyPolicy::NoPolicyRecorded => {
                let label = identity.label(&self.fallback_label);
                info!(network = %identity, "New network, asking for a proxy");
                let answer = self.resolver.prompt(label)?;
                (ProxyPolicy::from_answer(answer), Resolution::Learned)
            }
            stored => (stored, Resolution::Stored),
        };

        let apply_error = self.applier.apply(&policy).await.err();
        if let Some(e) = &apply_error {
            warn!(network = %identity, %policy, "{}", e);
        }

        if resolution == Resolution::Learned {
            policies.insert(identity.stable_id.clone(), policy.clone());
            self.store.save(&policies)?;
            info!(network = %identity, %policy, "Remembered proxy policy");
        }

        Ok(CycleOutcome::Resolved(CycleReport {
            identity,
            policy,
            resolution,
            apply_error,
        }))
    }

    /// Run one cycle per event until the source ends. A failed cycle is
    /// logged and the loop keeps waiting. Returns the number of cycles run.
    pub async fn run(&mut self, events: &mut dyn ChangeEventSource) -> usize {
        let mut cycles = 0;

        while let Some(event) = events.next_event().await {
            cycles += 1;
            let span = info_span!("cycle", n = cycles, %event);
            match self.run_cycle().instrument(span).await {
                Ok(CycleOutcome::Disconnected) => {}
                Ok(CycleOutcome::Resolved(report)) => {
                    debug!(
                        network = %report.identity,
                        policy = %report.policy,
                        resolution = ?report.resolution,
                        applied = report.apply_error.is_none(),
                        "Cycle complete"
                    );
                }
                Err(e) => error!(%event, "Resolution cycle failed: {}", e),
            }
        }

        info!(cycles, "Change monitor ended");
        cycles
    }
}
