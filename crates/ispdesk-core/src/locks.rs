// ── Per-device single flight ──
//
// At most one mutating call (apply, kick) runs against a device at a
// time, independent of what the front end disables.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::CoreError;
use crate::model::DeviceRecord;
use crate::model::EntityId;

#[derive(Default)]
pub(crate) struct DeviceLocks {
    locks: DashMap<EntityId, Arc<Mutex<()>>>,
}

impl DeviceLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Take the device's lock or fail with `Busy` if another operation
    /// holds it. Never waits.
    pub(crate) fn try_acquire(
        &self,
        device: &DeviceRecord,
        operation: &str,
    ) -> Result<OwnedMutexGuard<()>, CoreError> {
        let lock = Arc::clone(self.locks.entry(device.id.clone()).or_default().value());
        lock.try_lock_owned().map_err(|_| CoreError::Busy {
            device: device.name.clone(),
            operation: operation.into(),
        })
    }

    /// Drop the lock entry of a removed device.
    pub(crate) fn forget(&self, id: &EntityId) {
        self.locks.remove(id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::seed;

    #[test]
    fn second_acquire_is_busy_until_release() {
        let store = seed::demo_store();
        let device = store.device(&EntityId::from("MKT001")).unwrap();
        let locks = DeviceLocks::new();

        let guard = locks.try_acquire(&device, "config apply").unwrap();
        let err = locks.try_acquire(&device, "kick").unwrap_err();
        assert!(matches!(err, CoreError::Busy { ref operation, .. } if operation == "kick"));

        drop(guard);
        assert!(locks.try_acquire(&device, "kick").is_ok());
    }

    #[test]
    fn devices_lock_independently() {
        let store = seed::demo_store();
        let main = store.device(&EntityId::from("MKT001")).unwrap();
        let branch = store.device(&EntityId::from("MKT002")).unwrap();
        let locks = DeviceLocks::new();

        let _main = locks.try_acquire(&main, "config apply").unwrap();
        assert!(locks.try_acquire(&branch, "config apply").is_ok());
    }
}
