// ── Persistence ──
//
// The store is saved as one versioned JSON document. Device passwords
// only ever leave memory through `StoredDevice`; every other view of a
// `DeviceRecord` skips them.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::DataStore;
use super::seed;
use crate::error::CoreError;
use crate::model::{
    Customer, DeviceConfig, DeviceRecord, DeviceStatus, EntityId, Invoice, OnlineClientSession,
    Package, RouterOsVersion,
};

pub const STATE_VERSION: u32 = 1;

/// On-disk shape of the whole store. Lists are in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub version: u32,
    pub devices: Vec<StoredDevice>,
    pub configs: Vec<StoredConfig>,
    pub sessions: Vec<OnlineClientSession>,
    pub customers: Vec<Customer>,
    pub packages: Vec<Package>,
    pub invoices: Vec<Invoice>,
    pub open_tickets: u32,
}

/// `DeviceRecord` including its password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDevice {
    pub id: EntityId,
    pub name: String,
    pub host: String,
    pub api_port: u16,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub protocol_version: RouterOsVersion,
    pub timeout_seconds: u32,
    pub status: DeviceStatus,
    pub last_checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    pub device_id: EntityId,
    pub config: DeviceConfig,
}

impl From<StoredDevice> for DeviceRecord {
    fn from(d: StoredDevice) -> Self {
        Self {
            id: d.id,
            name: d.name,
            host: d.host,
            api_port: d.api_port,
            username: d.username,
            password: SecretString::from(d.password),
            protocol_version: d.protocol_version,
            timeout_seconds: d.timeout_seconds,
            status: d.status,
            last_checked_at: d.last_checked_at,
        }
    }
}

impl From<&DeviceRecord> for StoredDevice {
    fn from(d: &DeviceRecord) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            host: d.host.clone(),
            api_port: d.api_port,
            username: d.username.clone(),
            password: d.password.expose_secret().to_owned(),
            protocol_version: d.protocol_version,
            timeout_seconds: d.timeout_seconds,
            status: d.status,
            last_checked_at: d.last_checked_at,
        }
    }
}

impl StateDocument {
    /// Materialise a store from this document.
    pub fn into_store(self) -> DataStore {
        use super::collection::EntityCollection;

        let store = DataStore {
            devices: EntityCollection::from_ordered(
                self.devices
                    .into_iter()
                    .map(|d| (d.id.clone(), DeviceRecord::from(d))),
            ),
            sessions: EntityCollection::from_ordered(
                self.sessions.into_iter().map(|s| (s.id.clone(), s)),
            ),
            customers: EntityCollection::from_ordered(
                self.customers.into_iter().map(|c| (c.id.clone(), c)),
            ),
            packages: EntityCollection::from_ordered(
                self.packages.into_iter().map(|p| (p.id.clone(), p)),
            ),
            invoices: EntityCollection::from_ordered(
                self.invoices.into_iter().map(|i| (i.id.clone(), i)),
            ),
            ..DataStore::new()
        };
        for StoredConfig { device_id, config } in self.configs {
            store.set_config(device_id, config);
        }
        store.set_open_tickets(self.open_tickets);
        store.mark_clean();
        store
    }

    /// Capture the current store contents.
    pub fn from_store(store: &DataStore) -> Self {
        Self {
            version: STATE_VERSION,
            devices: store
                .devices_snapshot()
                .iter()
                .map(|d| StoredDevice::from(d.as_ref()))
                .collect(),
            configs: store
                .configs()
                .into_iter()
                .map(|(device_id, config)| StoredConfig {
                    device_id,
                    config: (*config).clone(),
                })
                .collect(),
            sessions: owned(store.sessions_snapshot()),
            customers: owned(store.customers_snapshot()),
            packages: owned(store.packages_snapshot()),
            invoices: owned(store.invoices_snapshot()),
            open_tickets: store.open_tickets(),
        }
    }
}

fn owned<T: Clone>(snap: Arc<Vec<Arc<T>>>) -> Vec<T> {
    snap.iter().map(|item| (**item).clone()).collect()
}

// ── Repository ──────────────────────────────────────────────────────

/// Where the store lives between runs.
#[derive(Debug, Clone)]
pub enum Repository {
    /// Demo data in memory, discarded on exit.
    Memory,
    /// A JSON state file, seeded on first use.
    StateFile(PathBuf),
}

impl Repository {
    pub fn load(&self) -> Result<DataStore, CoreError> {
        match self {
            Self::Memory => Ok(seed::demo_store()),
            Self::StateFile(path) => {
                if !path.exists() {
                    info!(path = %path.display(), "no state file, seeding demo data");
                    return Ok(seed::demo_store());
                }
                let raw = fs::read_to_string(path).map_err(|e| storage(path, &e))?;
                let doc: StateDocument =
                    serde_json::from_str(&raw).map_err(|e| storage(path, &e))?;
                if doc.version != STATE_VERSION {
                    return Err(CoreError::Storage {
                        path: path.display().to_string(),
                        reason: format!(
                            "unsupported state version {} (expected {STATE_VERSION})",
                            doc.version
                        ),
                    });
                }
                debug!(path = %path.display(), "loaded state file");
                Ok(doc.into_store())
            }
        }
    }

    /// Persist the store. Writes a sibling temp file and renames it over
    /// the target so a crash never leaves a torn document.
    pub fn save(&self, store: &DataStore) -> Result<(), CoreError> {
        let Self::StateFile(path) = self else {
            store.mark_clean();
            return Ok(());
        };

        let doc = StateDocument::from_store(store);
        let json = serde_json::to_string_pretty(&doc).map_err(|e| storage(path, &e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| storage(parent, &e))?;
        }
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, json.as_bytes()).map_err(|e| storage(&tmp, &e))?;
        fs::rename(&tmp, path).map_err(|e| storage(path, &e))?;

        store.mark_clean();
        debug!(path = %path.display(), "saved state file");
        Ok(())
    }
}

/// Write with owner-only permissions on unix: the file holds device passwords.
pub(crate) fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn storage(path: &Path, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::Storage {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
