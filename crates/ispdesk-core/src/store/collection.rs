// ── Generic reactive entity collection ──
//
// Concurrent storage with O(1) lookups, a stable newest-first ordering
// and push-based change notification via `watch` channels.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::EntityId;

struct Slot<T> {
    /// Insertion sequence. Higher is newer; replacing keeps it.
    seq: u64,
    value: Arc<T>,
}

/// A reactive collection for a single entity type.
///
/// Every mutation bumps a version counter and rebuilds the snapshot that
/// subscribers receive. Snapshots list the most recently inserted entity
/// first.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    by_id: DashMap<EntityId, Slot<T>>,
    next_seq: AtomicU64,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: DashMap::new(),
            next_seq: AtomicU64::new(0),
            version,
            snapshot,
        }
    }

    /// Build from a list already in display order (newest first).
    pub(crate) fn from_ordered(items: impl IntoIterator<Item = (EntityId, T)>) -> Self {
        let col = Self::new();
        let items: Vec<_> = items.into_iter().collect();
        for (id, value) in items.into_iter().rev() {
            col.insert_slot(id, value);
        }
        col.publish();
        col
    }

    /// Insert a new entity at the front. An existing entity with the same
    /// id is moved to the front.
    pub(crate) fn push_front(&self, id: EntityId, entity: T) {
        self.insert_slot(id, entity);
        self.publish();
    }

    /// Insert several entities so they appear at the front in the given order.
    pub(crate) fn push_front_all(&self, items: Vec<(EntityId, T)>) {
        for (id, value) in items.into_iter().rev() {
            self.insert_slot(id, value);
        }
        self.publish();
    }

    /// Replace an existing entity in place. Returns `false` (and inserts
    /// nothing) when the id is unknown.
    pub(crate) fn replace(&self, id: &EntityId, entity: T) -> bool {
        let replaced = match self.by_id.get_mut(id) {
            Some(mut slot) => {
                slot.value = Arc::new(entity);
                true
            }
            None => false,
        };
        if replaced {
            self.publish();
        }
        replaced
    }

    /// Read-modify-write one entity while holding its entry lock, so a
    /// concurrent `replace` cannot be lost. Returns `false` when the id is
    /// unknown.
    pub(crate) fn update_with(&self, id: &EntityId, f: impl FnOnce(&T) -> T) -> bool {
        let updated = match self.by_id.get_mut(id) {
            Some(mut slot) => {
                let next = f(&slot.value);
                slot.value = Arc::new(next);
                true
            }
            None => false,
        };
        if updated {
            self.publish();
        }
        updated
    }

    /// Remove an entity. Returns it if it existed.
    pub(crate) fn remove(&self, id: &EntityId) -> Option<Arc<T>> {
        let removed = self.by_id.remove(id).map(|(_, slot)| slot.value);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    /// Swap the whole contents for a new list in display order.
    pub(crate) fn reset(&self, items: Vec<(EntityId, T)>) {
        self.by_id.clear();
        for (id, value) in items.into_iter().rev() {
            self.insert_slot(id, value);
        }
        self.publish();
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.by_id.get(id).map(|slot| Arc::clone(&slot.value))
    }

    pub(crate) fn contains(&self, id: &EntityId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn insert_slot(&self, id: EntityId, value: T) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.by_id.insert(
            id,
            Slot {
                seq,
                value: Arc::new(value),
            },
        );
    }

    /// Rebuild the ordered snapshot, broadcast it and bump the version.
    fn publish(&self) {
        let mut slots: Vec<(u64, Arc<T>)> = self
            .by_id
            .iter()
            .map(|r| (r.seq, Arc::clone(&r.value)))
            .collect();
        slots.sort_by(|a, b| b.0.cmp(&a.0));
        let values: Vec<Arc<T>> = slots.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
        self.version.send_modify(|v| *v += 1);
    }
}
