// ── Connection tester ──
//
// Per-device reachability probes. A device's state goes
// idle -> testing -> success|failed -> idle; the terminal state stays
// visible for a fixed window before it is cleared. While any state is
// present, a new probe for that device is refused.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::DeviceBackend;
use crate::error::CoreError;
use crate::model::{DeviceRecord, EntityId};
use crate::store::DataStore;

/// Default time a terminal state stays visible.
pub const DEFAULT_PROBE_RESET: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProbeState {
    Testing,
    Success,
    Failed,
}

/// What one probe found. A failed probe is still `Ok` at the call site:
/// the failure is a status to show, not an error to propagate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub device_id: EntityId,
    pub device_name: String,
    pub state: ProbeState,
    #[serde(with = "millis")]
    pub latency: Option<Duration>,
    pub detail: String,
}

pub type ProbeStates = Arc<HashMap<EntityId, ProbeState>>;

#[derive(Clone)]
pub struct ConnectionTester {
    inner: Arc<TesterInner>,
}

struct TesterInner {
    store: Arc<DataStore>,
    backend: Arc<DeviceBackend>,
    states: DashMap<EntityId, ProbeState>,
    snapshot: watch::Sender<ProbeStates>,
    reset_after: Duration,
}

impl ConnectionTester {
    pub(crate) fn new(
        store: Arc<DataStore>,
        backend: Arc<DeviceBackend>,
        reset_after: Duration,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(HashMap::new()));
        Self {
            inner: Arc::new(TesterInner {
                store,
                backend,
                states: DashMap::new(),
                snapshot,
                reset_after,
            }),
        }
    }

    /// Probe one device.
    ///
    /// The probe runs on its own task, bounded by the device's
    /// `timeoutSeconds`, so dropping the returned future does not stop it
    /// from finishing and publishing its result.
    pub async fn test_connection(&self, id: &EntityId) -> Result<ProbeOutcome, CoreError> {
        let device = self
            .inner
            .store
            .device(id)
            .ok_or_else(|| CoreError::not_found("server", id))?;

        match self.inner.states.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(CoreError::Busy {
                    device: device.name.clone(),
                    operation: "connection test".into(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(ProbeState::Testing);
            }
        }
        self.inner.publish();
        debug!(device = %device.name, "probe started");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(device).await })
            .await
            .map_err(|e| CoreError::Internal(format!("probe task failed: {e}")))
    }

    /// Current state for one device. `None` means idle.
    pub fn state(&self, id: &EntityId) -> Option<ProbeState> {
        self.inner.states.get(id).map(|s| *s)
    }

    pub fn snapshot(&self) -> ProbeStates {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProbeStates> {
        self.inner.snapshot.subscribe()
    }
}

impl TesterInner {
    async fn run(self: Arc<Self>, device: Arc<DeviceRecord>) -> ProbeOutcome {
        let mut testing = ClearOnUnwind::new(Arc::clone(&self), device.id.clone());
        let result = self.backend.probe(&device).await;

        let outcome = match result {
            Ok(report) => {
                info!(device = %device.name, latency_ms = report.latency.as_millis(), "probe succeeded");
                self.touch(&device.id);
                ProbeOutcome {
                    device_id: device.id.clone(),
                    device_name: device.name.clone(),
                    state: ProbeState::Success,
                    latency: Some(report.latency),
                    detail: report.detail,
                }
            }
            Err(e) => {
                warn!(device = %device.name, error = %e, "probe failed");
                ProbeOutcome {
                    device_id: device.id.clone(),
                    device_name: device.name.clone(),
                    state: ProbeState::Failed,
                    latency: None,
                    detail: e.to_string(),
                }
            }
        };

        self.states.insert(device.id.clone(), outcome.state);
        testing.disarm();
        self.publish();

        let inner = Arc::clone(&self);
        let id = device.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.reset_after).await;
            inner.states.remove(&id);
            inner.publish();
        });

        outcome
    }

    /// Refresh `lastCheckedAt` after a successful probe. Works on the
    /// record as it is now, so edits made during the probe survive. A
    /// device removed meanwhile stays removed.
    fn touch(&self, id: &EntityId) {
        let now = Utc::now();
        let touched = self.store.devices.update_with(id, |current| {
            let mut updated = current.clone();
            updated.last_checked_at = now;
            updated
        });
        if touched {
            self.store.mark_dirty();
        }
    }

    fn publish(&self) {
        let states: HashMap<EntityId, ProbeState> = self
            .states
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(states));
    }
}

/// Clears a device's `Testing` state if the probe task unwinds before
/// publishing a terminal state.
struct ClearOnUnwind {
    inner: Arc<TesterInner>,
    id: EntityId,
    armed: bool,
}

impl ClearOnUnwind {
    fn new(inner: Arc<TesterInner>, id: EntityId) -> Self {
        Self {
            inner,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ClearOnUnwind {
    fn drop(&mut self) {
        if self.armed {
            warn!(device = %self.id, "probe ended without a result, clearing state");
            self.inner.states.remove(&self.id);
            self.inner.publish();
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }
}
