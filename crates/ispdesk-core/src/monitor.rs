// ── Online client monitor ──

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::backend::{DeviceBackend, KickOutcome};
use crate::error::CoreError;
use crate::locks::DeviceLocks;
use crate::model::{DeviceRecord, EntityId, OnlineClientSession};
use crate::store::DataStore;
use crate::validation::FieldErrors;

/// Live session table across all managed routers.
#[derive(Clone)]
pub struct ClientMonitor {
    store: Arc<DataStore>,
    backend: Arc<DeviceBackend>,
    locks: Arc<DeviceLocks>,
}

impl ClientMonitor {
    pub(crate) fn new(
        store: Arc<DataStore>,
        backend: Arc<DeviceBackend>,
        locks: Arc<DeviceLocks>,
    ) -> Self {
        Self {
            store,
            backend,
            locks,
        }
    }

    /// Sessions matching `filter` (case-insensitive, any field). An empty
    /// filter returns everything.
    pub fn list(&self, filter: &str) -> Vec<Arc<OnlineClientSession>> {
        self.store
            .sessions_snapshot()
            .iter()
            .filter(|s| s.matches(filter))
            .cloned()
            .collect()
    }

    /// Re-read sessions from every active device and replace the table.
    /// Devices that fail are skipped, so their sessions disappear until
    /// the next successful refresh.
    pub async fn refresh(&self) -> usize {
        let devices: Vec<_> = self
            .store
            .devices_snapshot()
            .iter()
            .filter(|d| d.is_active())
            .cloned()
            .collect();

        let results = join_all(devices.iter().map(|device| {
            let backend = Arc::clone(&self.backend);
            async move { (device, backend.list_sessions(device).await) }
        }))
        .await;

        let mut sessions = Vec::new();
        for (device, result) in results {
            match result {
                Ok(found) => {
                    debug!(device = %device.name, count = found.len(), "sessions read");
                    sessions.extend(found);
                }
                Err(e) => warn!(device = %device.name, error = %e, "skipping device in session refresh"),
            }
        }

        let count = sessions.len();
        self.store
            .sessions
            .reset(sessions.into_iter().map(|s| (s.id.clone(), s)).collect());
        self.store.mark_dirty();
        info!(sessions = count, "session table refreshed");
        count
    }

    /// Disconnect one session.
    ///
    /// Idempotent: a session that is no longer listed is reported as
    /// [`KickOutcome::AlreadyGone`], and so is one whose router has been
    /// removed from the registry (its row is dropped locally). On failure
    /// the row stays.
    pub async fn kick(&self, session_id: &EntityId) -> Result<KickOutcome, CoreError> {
        let Some(session) = self.store.session(session_id) else {
            debug!(session = %session_id, "kick target already gone");
            return Ok(KickOutcome::AlreadyGone);
        };
        let Some(device) = self.reporting_device(&session)? else {
            if self.store.sessions.remove(&session.id).is_some() {
                self.store.mark_dirty();
            }
            info!(
                session = %session.id,
                server = %session.server,
                "router no longer registered, dropping session row"
            );
            return Ok(KickOutcome::AlreadyGone);
        };
        let guard = self.locks.try_acquire(&device, "kick")?;

        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);
        let task = tokio::spawn(async move {
            let _held = guard;
            let outcome = backend.kick(&device, &session).await?;
            if store.sessions.remove(&session.id).is_some() {
                store.mark_dirty();
            }
            info!(
                session = %session.id,
                username = %session.username,
                device = %device.name,
                ?outcome,
                "session kicked"
            );
            Ok::<_, CoreError>(outcome)
        });

        task.await
            .map_err(|e| CoreError::Internal(format!("kick task failed: {e}")))?
    }

    /// The router a session belongs to: by id when the row carries one,
    /// otherwise by its `server` label, which must name exactly one device.
    fn reporting_device(
        &self,
        session: &OnlineClientSession,
    ) -> Result<Option<Arc<DeviceRecord>>, CoreError> {
        if let Some(id) = &session.device_id {
            return Ok(self.store.device(id));
        }
        let mut named = self.store.devices_named(&session.server);
        match named.len() {
            0 | 1 => Ok(named.pop()),
            n => Err(FieldErrors::single(
                "server",
                &format!("{n} servers are named '{}'; refresh sessions and retry", session.server),
            )),
        }
    }
}
