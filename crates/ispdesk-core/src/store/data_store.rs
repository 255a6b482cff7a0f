// ── Central reactive data store ──
//
// Thread-safe storage for every ispdesk entity. Collections broadcast
// changes through `watch` channels; device configs are immutable
// snapshots swapped by reference on commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use dashmap::DashMap;
use tokio::sync::watch;

use super::collection::EntityCollection;
use crate::model::{
    Customer, DeviceConfig, DeviceRecord, EntityId, Invoice, OnlineClientSession, Package,
};

/// Central store for registry, monitor and billing data.
///
/// Every mutation sets the dirty flag so a front end knows to persist.
pub struct DataStore {
    pub(crate) devices: EntityCollection<DeviceRecord>,
    pub(crate) sessions: EntityCollection<OnlineClientSession>,
    pub(crate) customers: EntityCollection<Customer>,
    pub(crate) packages: EntityCollection<Package>,
    pub(crate) invoices: EntityCollection<Invoice>,
    pub(super) configs: DashMap<EntityId, Arc<DeviceConfig>>,
    pub(super) open_tickets: AtomicU32,
    pub(super) dirty: AtomicBool,
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            devices: EntityCollection::new(),
            sessions: EntityCollection::new(),
            customers: EntityCollection::new(),
            packages: EntityCollection::new(),
            invoices: EntityCollection::new(),
            configs: DashMap::new(),
            open_tickets: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn devices_snapshot(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        self.devices.snapshot()
    }

    pub fn sessions_snapshot(&self) -> Arc<Vec<Arc<OnlineClientSession>>> {
        self.sessions.snapshot()
    }

    pub fn customers_snapshot(&self) -> Arc<Vec<Arc<Customer>>> {
        self.customers.snapshot()
    }

    pub fn packages_snapshot(&self) -> Arc<Vec<Arc<Package>>> {
        self.packages.snapshot()
    }

    pub fn invoices_snapshot(&self) -> Arc<Vec<Arc<Invoice>>> {
        self.invoices.snapshot()
    }

    pub fn subscribe_devices(&self) -> watch::Receiver<Arc<Vec<Arc<DeviceRecord>>>> {
        self.devices.subscribe()
    }

    pub fn subscribe_sessions(&self) -> watch::Receiver<Arc<Vec<Arc<OnlineClientSession>>>> {
        self.sessions.subscribe()
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn device(&self, id: &EntityId) -> Option<Arc<DeviceRecord>> {
        self.devices.get(id)
    }

    /// Every device whose name is exactly `name`. Names are not unique.
    pub fn devices_named(&self, name: &str) -> Vec<Arc<DeviceRecord>> {
        self.devices
            .snapshot()
            .iter()
            .filter(|d| d.name == name)
            .cloned()
            .collect()
    }

    pub fn session(&self, id: &EntityId) -> Option<Arc<OnlineClientSession>> {
        self.sessions.get(id)
    }

    pub fn customer(&self, id: &EntityId) -> Option<Arc<Customer>> {
        self.customers.get(id)
    }

    pub fn invoice(&self, id: &EntityId) -> Option<Arc<Invoice>> {
        self.invoices.get(id)
    }

    pub fn package_by_name(&self, name: &str) -> Option<Arc<Package>> {
        let name = name.trim();
        self.packages
            .snapshot()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    // ── Device configs ───────────────────────────────────────────────

    pub fn config(&self, device_id: &EntityId) -> Option<Arc<DeviceConfig>> {
        self.configs.get(device_id).map(|c| Arc::clone(c.value()))
    }

    /// Commit a config snapshot: a single reference swap.
    pub(crate) fn set_config(&self, device_id: EntityId, config: DeviceConfig) {
        self.configs.insert(device_id, Arc::new(config));
        self.mark_dirty();
    }

    /// Remember what was read from the device. Not a user change, so the
    /// dirty flag is left alone.
    pub(crate) fn cache_config(&self, device_id: EntityId, config: DeviceConfig) {
        self.configs.insert(device_id, Arc::new(config));
    }

    pub(crate) fn remove_config(&self, device_id: &EntityId) {
        self.configs.remove(device_id);
    }

    pub(crate) fn configs(&self) -> Vec<(EntityId, Arc<DeviceConfig>)> {
        let mut all: Vec<_> = self
            .configs
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    // ── Counters and persistence state ───────────────────────────────

    pub fn open_tickets(&self) -> u32 {
        self.open_tickets.load(Ordering::Relaxed)
    }

    pub(crate) fn set_open_tickets(&self, count: u32) {
        self.open_tickets.store(count, Ordering::Relaxed);
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Whether anything changed since load or the last [`mark_clean`](Self::mark_clean).
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
