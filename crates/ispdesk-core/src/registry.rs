// ── Server registry ──
//
// CRUD over managed router records. Removal is two-step: a
// `RemovalRequest` can only come from `request_removal`, so nothing is
// deleted without the caller having asked first.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::locks::DeviceLocks;
use crate::model::{DeviceDraft, DeviceRecord, DraftMode, EntityId};
use crate::store::DataStore;

/// Handle for the device inventory.
#[derive(Clone)]
pub struct Registry {
    store: Arc<DataStore>,
    locks: Arc<DeviceLocks>,
}

/// Proof that the caller asked to remove a device. Show
/// [`prompt`](Self::prompt) to the user, then pass this to
/// [`Registry::confirm_removal`].
#[derive(Debug)]
pub struct RemovalRequest {
    id: EntityId,
    name: String,
}

impl RemovalRequest {
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to delete the server \"{}\"? This action cannot be undone.",
            self.name
        )
    }
}

impl Registry {
    pub(crate) fn new(store: Arc<DataStore>, locks: Arc<DeviceLocks>) -> Self {
        Self { store, locks }
    }

    /// All records, newest first.
    pub fn list(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        self.store.devices_snapshot()
    }

    pub fn get(&self, id: &EntityId) -> Result<Arc<DeviceRecord>, CoreError> {
        self.store
            .device(id)
            .ok_or_else(|| CoreError::not_found("server", id))
    }

    pub fn add(&self, draft: DeviceDraft) -> Result<Arc<DeviceRecord>, CoreError> {
        if let Err(e) = draft.validate(DraftMode::Create) {
            debug!(error = %e, "rejected new server");
            return Err(e);
        }
        let id = EntityId::generate();
        let record = DeviceRecord::from_draft(id.clone(), draft, Utc::now());
        info!(id = %id, name = %record.name, host = %record.host, "server added");

        self.store.devices.push_front(id.clone(), record);
        self.store.mark_dirty();
        self.get(&id)
    }

    /// Merge an edit. An empty password keeps the stored one.
    pub fn update(&self, id: &EntityId, draft: DeviceDraft) -> Result<Arc<DeviceRecord>, CoreError> {
        self.get(id)?;
        if let Err(e) = draft.validate(DraftMode::Update) {
            debug!(error = %e, "rejected server edit");
            return Err(e);
        }
        let now = Utc::now();
        if !self.store.devices.update_with(id, |current| current.merge(draft, now)) {
            return Err(CoreError::not_found("server", id));
        }
        self.store.mark_dirty();
        let record = self.get(id)?;
        info!(id = %id, name = %record.name, "server updated");
        Ok(record)
    }

    /// First step of removal. Unknown ids fail here without touching
    /// the list.
    pub fn request_removal(&self, id: &EntityId) -> Result<RemovalRequest, CoreError> {
        let record = self.get(id)?;
        Ok(RemovalRequest {
            id: record.id.clone(),
            name: record.name.clone(),
        })
    }

    /// Second step: delete the record and its cached configuration.
    /// Refused while an apply or kick holds the device.
    pub fn confirm_removal(&self, request: RemovalRequest) -> Result<Arc<DeviceRecord>, CoreError> {
        let record = self.get(&request.id)?;
        let guard = self.locks.try_acquire(&record, "removal")?;

        let removed = self
            .store
            .devices
            .remove(&request.id)
            .ok_or_else(|| CoreError::not_found("server", &request.id))?;
        self.store.remove_config(&request.id);
        self.store.mark_dirty();
        info!(id = %request.id, name = %request.name, "server removed");

        drop(guard);
        self.locks.forget(&request.id);
        Ok(removed)
    }
}
