// ── Device control surface ──
//
// The five operations every managed router supports: probe, fetch
// config, apply config, list sessions, kick. `DeviceBackend` is a
// closed set, so dispatch is a plain match.

mod routeros;
mod simulated;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

pub use routeros::RouterOsConnector;
pub use simulated::SimulatedRouter;

use crate::error::CoreError;
use crate::model::{DeviceConfig, DeviceRecord, OnlineClientSession};

/// Result of a successful reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub latency: Duration,
    pub detail: String,
}

/// How a kick request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KickOutcome {
    Disconnected,
    /// The session was already gone. Not an error.
    AlreadyGone,
}

/// The implementation behind device-facing operations.
pub enum DeviceBackend {
    Simulated(SimulatedRouter),
    RouterOs(RouterOsConnector),
}

impl DeviceBackend {
    pub async fn probe(&self, device: &DeviceRecord) -> Result<ProbeReport, CoreError> {
        with_deadline(device, async {
            match self {
                Self::Simulated(sim) => sim.probe(device).await,
                Self::RouterOs(ros) => ros.probe(device).await,
            }
        })
        .await
    }

    pub async fn fetch_config(&self, device: &DeviceRecord) -> Result<DeviceConfig, CoreError> {
        with_deadline(device, async {
            match self {
                Self::Simulated(sim) => sim.fetch_config(device).await,
                Self::RouterOs(ros) => ros.fetch_config(device).await,
            }
        })
        .await
    }

    /// Push the sections of `desired` that differ from `baseline` as one
    /// unit: either every change lands or the device is put back the way
    /// it was.
    pub async fn apply_config(
        &self,
        device: &DeviceRecord,
        baseline: &DeviceConfig,
        desired: &DeviceConfig,
    ) -> Result<(), CoreError> {
        match self {
            Self::Simulated(sim) => with_deadline(device, sim.apply_config(device, desired)).await,
            // Bounds its own forward pass so a rollback can still run
            Self::RouterOs(ros) => ros
                .apply_config(device, baseline, desired)
                .await
                .map_err(|e| e.on_device(&device.name)),
        }
    }

    pub async fn list_sessions(
        &self,
        device: &DeviceRecord,
    ) -> Result<Vec<OnlineClientSession>, CoreError> {
        with_deadline(device, async {
            match self {
                Self::Simulated(sim) => sim.list_sessions(device).await,
                Self::RouterOs(ros) => ros.list_sessions(device).await,
            }
        })
        .await
    }

    pub async fn kick(
        &self,
        device: &DeviceRecord,
        session: &OnlineClientSession,
    ) -> Result<KickOutcome, CoreError> {
        with_deadline(device, async {
            match self {
                Self::Simulated(sim) => sim.kick(device, session).await,
                Self::RouterOs(ros) => ros.kick(device, session).await,
            }
        })
        .await
    }
}

/// Enforce the device's `timeoutSeconds` as a hard deadline on one call
/// and tag any connectivity error with the device name.
async fn with_deadline<T>(
    device: &DeviceRecord,
    call: impl Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    match tokio::time::timeout(device.timeout(), call).await {
        Ok(result) => result.map_err(|e| e.on_device(&device.name)),
        Err(_) => Err(CoreError::Timeout {
            device: device.name.clone(),
            timeout_secs: u64::from(device.timeout_seconds),
        }),
    }
}
