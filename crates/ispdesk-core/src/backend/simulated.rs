// ── In-process router stand-in ──
//
// Device state lives in the store. Every call waits a fixed latency,
// then succeeds unless the host is listed as unreachable.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use tracing::debug;

use super::{KickOutcome, ProbeReport};
use crate::error::CoreError;
use crate::model::{DeviceConfig, DeviceRecord, DnsConfig, NtpConfig, OnlineClientSession};
use crate::store::DataStore;

pub struct SimulatedRouter {
    store: Arc<DataStore>,
    latency: Duration,
    unreachable_hosts: HashSet<String>,
}

impl SimulatedRouter {
    pub fn new(
        store: Arc<DataStore>,
        latency: Duration,
        unreachable_hosts: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            latency,
            unreachable_hosts: unreachable_hosts
                .into_iter()
                .map(|h| h.trim().to_lowercase())
                .collect(),
        }
    }

    async fn connect(&self, device: &DeviceRecord) -> Result<(), CoreError> {
        tokio::time::sleep(self.latency).await;
        if self.unreachable_hosts.contains(&device.host.to_lowercase()) {
            return Err(CoreError::Connectivity {
                device: device.name.clone(),
                reason: format!("no route to host {}:{}", device.host, device.api_port),
            });
        }
        Ok(())
    }

    pub(super) async fn probe(&self, device: &DeviceRecord) -> Result<ProbeReport, CoreError> {
        self.connect(device).await?;
        if !device.is_active() {
            return Err(CoreError::Connectivity {
                device: device.name.clone(),
                reason: "device is disabled".into(),
            });
        }
        Ok(ProbeReport {
            latency: self.latency,
            detail: format!("RouterOS {} (simulated)", device.protocol_version),
        })
    }

    pub(super) async fn fetch_config(
        &self,
        device: &DeviceRecord,
    ) -> Result<DeviceConfig, CoreError> {
        self.connect(device).await?;
        if let Some(config) = self.store.config(&device.id) {
            return Ok((*config).clone());
        }
        debug!(device = %device.name, "no stored config, starting from factory defaults");
        let now = Utc::now().naive_utc();
        Ok(DeviceConfig {
            identity: device.name.clone(),
            system_date: now.date(),
            system_time: now.time().with_nanosecond(0).unwrap_or_default(),
            ntp: NtpConfig::default(),
            dns: DnsConfig::default(),
            firewall_rules: Vec::new(),
        })
    }

    pub(super) async fn apply_config(
        &self,
        device: &DeviceRecord,
        desired: &DeviceConfig,
    ) -> Result<(), CoreError> {
        self.connect(device).await?;
        debug!(
            device = %device.name,
            rules = desired.firewall_rules.len(),
            "simulated apply accepted"
        );
        Ok(())
    }

    pub(super) async fn list_sessions(
        &self,
        device: &DeviceRecord,
    ) -> Result<Vec<OnlineClientSession>, CoreError> {
        self.connect(device).await?;
        Ok(self
            .store
            .sessions_snapshot()
            .iter()
            .filter(|s| match &s.device_id {
                Some(id) => *id == device.id,
                None => s.server == device.name,
            })
            .map(|s| (**s).clone())
            .collect())
    }

    pub(super) async fn kick(
        &self,
        device: &DeviceRecord,
        session: &OnlineClientSession,
    ) -> Result<KickOutcome, CoreError> {
        self.connect(device).await?;
        if self.store.session(&session.id).is_some() {
            Ok(KickOutcome::Disconnected)
        } else {
            Ok(KickOutcome::AlreadyGone)
        }
    }
}
