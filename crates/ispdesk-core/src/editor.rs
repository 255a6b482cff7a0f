// ── Configuration editor ──
//
// Load a router's configuration into an `EditSession`, mutate the draft
// locally, then push it back in one confirmed apply. The draft never
// touches the store until the device has accepted it.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, warn};

use crate::backend::DeviceBackend;
use crate::error::CoreError;
use crate::locks::DeviceLocks;
use crate::model::{
    ConfigEdit, ConfigSection, DeviceConfig, DeviceRecord, DnsEdit, EntityId, NtpEdit, RuleEdit,
};
use crate::store::DataStore;

/// A loaded configuration plus the caller's pending edits.
#[derive(Debug, Clone)]
pub struct EditSession {
    device: Arc<DeviceRecord>,
    original: DeviceConfig,
    draft: DeviceConfig,
}

impl EditSession {
    pub fn device(&self) -> &DeviceRecord {
        &self.device
    }

    /// The configuration as last read from (or applied to) the device.
    pub fn original(&self) -> &DeviceConfig {
        &self.original
    }

    pub fn draft(&self) -> &DeviceConfig {
        &self.draft
    }

    /// Apply one edit to the draft. On error the draft is unchanged.
    pub fn apply_edit(&mut self, edit: ConfigEdit) -> Result<&DeviceConfig, CoreError> {
        let next = self.draft.apply_edit(edit)?;
        self.draft = next;
        Ok(&self.draft)
    }

    pub fn set_identity(&mut self, identity: impl Into<String>) -> Result<&DeviceConfig, CoreError> {
        self.apply_edit(ConfigEdit::Identity(identity.into()))
    }

    pub fn set_system_date(&mut self, date: NaiveDate) -> Result<&DeviceConfig, CoreError> {
        self.apply_edit(ConfigEdit::SystemDate(date))
    }

    pub fn set_system_time(&mut self, time: NaiveTime) -> Result<&DeviceConfig, CoreError> {
        self.apply_edit(ConfigEdit::SystemTime(time))
    }

    pub fn set_ntp(&mut self, edit: NtpEdit) -> Result<&DeviceConfig, CoreError> {
        self.apply_edit(ConfigEdit::Ntp(edit))
    }

    pub fn set_dns(&mut self, edit: DnsEdit) -> Result<&DeviceConfig, CoreError> {
        self.apply_edit(ConfigEdit::Dns(edit))
    }

    pub fn toggle_firewall_rule(
        &mut self,
        rule_id: &EntityId,
        enabled: bool,
    ) -> Result<&DeviceConfig, CoreError> {
        self.apply_edit(ConfigEdit::ToggleRule {
            rule_id: rule_id.clone(),
            enabled,
        })
    }

    pub fn set_firewall_rule_field(
        &mut self,
        rule_id: &EntityId,
        edit: RuleEdit,
    ) -> Result<&DeviceConfig, CoreError> {
        self.apply_edit(ConfigEdit::RuleField {
            rule_id: rule_id.clone(),
            edit,
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.original
    }

    /// Sections of the draft that differ from the original.
    pub fn changes(&self) -> Vec<ConfigSection> {
        self.draft.changed_sections(&self.original)
    }

    /// Throw the pending edits away.
    pub fn discard(&mut self) {
        self.draft = self.original.clone();
    }
}

/// A confirmed-in-principle apply. Show [`warning`](Self::warning) and
/// hand this back to [`ConfigEditor::apply`].
#[derive(Debug)]
pub struct ApplyRequest {
    device: Arc<DeviceRecord>,
    baseline: DeviceConfig,
    snapshot: DeviceConfig,
    changes: Vec<ConfigSection>,
}

impl ApplyRequest {
    pub fn device_name(&self) -> &str {
        &self.device.name
    }

    pub fn changes(&self) -> &[ConfigSection] {
        &self.changes
    }

    pub fn warning(&self) -> String {
        format!(
            "Are you sure you want to apply these changes to the router \"{}\"? \
             This could affect network connectivity.",
            self.device.name
        )
    }
}

#[derive(Clone)]
pub struct ConfigEditor {
    store: Arc<DataStore>,
    backend: Arc<DeviceBackend>,
    locks: Arc<DeviceLocks>,
}

impl ConfigEditor {
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

    /// Read the device's current configuration and open an edit session
    /// on it.
    pub async fn load(&self, device_id: &EntityId) -> Result<EditSession, CoreError> {
        let device = self
            .store
            .device(device_id)
            .ok_or_else(|| CoreError::not_found("server", device_id))?;

        let config = self.backend.fetch_config(&device).await?;
        debug!(device = %device.name, rules = config.firewall_rules.len(), "config loaded");
        self.store.cache_config(device.id.clone(), config.clone());

        Ok(EditSession {
            device,
            original: config.clone(),
            draft: config,
        })
    }

    /// Last configuration read or applied, without contacting the device.
    pub fn cached(&self, device_id: &EntityId) -> Option<Arc<DeviceConfig>> {
        self.store.config(device_id)
    }

    /// First step of an apply. Freezes the current draft.
    pub fn request_apply(&self, session: &EditSession) -> ApplyRequest {
        ApplyRequest {
            device: Arc::clone(&session.device),
            baseline: session.original.clone(),
            snapshot: session.draft.clone(),
            changes: session.changes(),
        }
    }

    /// Push the frozen draft to the device.
    ///
    /// Runs on its own task under the device lock so an interrupted
    /// caller cannot leave the router half written. On success the stored
    /// config and `session.original` become the applied snapshot. On
    /// failure both are untouched and the draft is kept for a manual
    /// retry.
    pub async fn apply(
        &self,
        request: ApplyRequest,
        session: &mut EditSession,
    ) -> Result<Arc<DeviceConfig>, CoreError> {
        if request.device.id != session.device.id {
            return Err(CoreError::Internal(
                "apply request belongs to another device".into(),
            ));
        }
        let guard = self.locks.try_acquire(&request.device, "config apply")?;

        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);
        let task = tokio::spawn(async move {
            let _held = guard;
            let ApplyRequest {
                device,
                baseline,
                snapshot,
                changes,
            } = request;

            backend.apply_config(&device, &baseline, &snapshot).await?;
            store.set_config(device.id.clone(), snapshot);
            let applied = store
                .config(&device.id)
                .ok_or_else(|| CoreError::Internal("applied config vanished".into()))?;
            info!(
                device = %device.name,
                sections = ?changes.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "config applied"
            );
            Ok::<_, CoreError>(applied)
        });

        let result = task
            .await
            .map_err(|e| CoreError::Internal(format!("apply task failed: {e}")))?;
        match result {
            Ok(applied) => {
                session.original = (*applied).clone();
                Ok(applied)
            }
            Err(e) => {
                warn!(device = %session.device.name, error = %e, "config apply failed, draft kept");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::SimulatedRouter;
    use crate::model::FirewallAction;
    use crate::store::seed;
    use pretty_assertions::assert_eq;

    fn new_editor(unreachable: &[&str]) -> ConfigEditor {
        let store = Arc::new(seed::demo_store());
        let backend = DeviceBackend::Simulated(SimulatedRouter::new(
            Arc::clone(&store),
            Duration::from_millis(300),
            unreachable.iter().map(|h| (*h).to_owned()),
        ));
        ConfigEditor::new(store, Arc::new(backend), Arc::new(DeviceLocks::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn apply_commits_draft_and_rebases_session() {
        let editor = new_editor(&[]);
        let id = EntityId::from("MKT001");
        let mut session = editor.load(&id).await.unwrap();
        assert!(!session.is_dirty());

        session.set_identity("MainRouter-Core").unwrap();
        session
            .set_firewall_rule_field(&EntityId::from("fw2"), RuleEdit::Action(FirewallAction::Reject))
            .unwrap();
        assert_eq!(session.changes(), vec![ConfigSection::Identity, ConfigSection::FirewallRules]);

        let request = editor.request_apply(&session);
        assert!(request.warning().contains("\"Main POP\""));
        let applied = editor.apply(request, &mut session).await.unwrap();

        assert_eq!(applied.identity, "MainRouter-Core");
        assert_eq!(editor.cached(&id).unwrap().identity, "MainRouter-Core");
        assert!(!session.is_dirty());
        assert!(editor.store.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_apply_keeps_draft_and_stored_config() {
        let editor = new_editor(&[]);
        let id = EntityId::from("MKT002");
        let mut session = editor.load(&id).await.unwrap();
        let stored_before = editor.cached(&id).unwrap();
        session.set_identity("Branch-Renamed").unwrap();

        // Take the device offline between load and apply.
        let offline = new_editor(&["router.branch1.isp.com"]);
        let offline = ConfigEditor {
            store: Arc::clone(&editor.store),
            ..offline
        };
        let request = offline.request_apply(&session);
        let err = offline.apply(request, &mut session).await.unwrap_err();

        assert!(matches!(err, CoreError::Connectivity { .. }));
        assert_eq!(session.draft().identity, "Branch-Renamed");
        assert!(session.is_dirty());
        assert_eq!(editor.cached(&id).unwrap(), stored_before);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_edit_leaves_draft_alone() {
        let editor = new_editor(&[]);
        let mut session = editor.load(&EntityId::from("MKT002")).await.unwrap();
        let before = session.draft().clone();

        assert!(session.set_identity("  ").is_err());
        assert!(session.toggle_firewall_rule(&EntityId::from("nope"), false).is_err());
        assert_eq!(session.draft(), &before);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_apply_on_same_device_is_busy() {
        let editor = new_editor(&[]);
        let id = EntityId::from("MKT001");
        let mut first = editor.load(&id).await.unwrap();
        let mut second = first.clone();
        first.set_identity("A").unwrap();
        second.set_identity("B").unwrap();

        let held = editor
            .locks
            .try_acquire(first.device(), "config apply")
            .unwrap();
        let request = editor.request_apply(&second);
        let err = editor.apply(request, &mut second).await.unwrap_err();
        assert!(matches!(err, CoreError::Busy { .. }));
        drop(held);

        let request = editor.request_apply(&first);
        assert!(editor.apply(request, &mut first).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn discard_restores_original() {
        let editor = new_editor(&[]);
        let mut session = editor.load(&EntityId::from("MKT001")).await.unwrap();
        session.set_dns(DnsEdit::PrimaryServer("1.1.1.1".into())).unwrap();
        assert!(session.is_dirty());
        session.discard();
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn load_unknown_device_is_not_found() {
        let editor = new_editor(&[]);
        let err = editor.load(&EntityId::from("MKT404")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
