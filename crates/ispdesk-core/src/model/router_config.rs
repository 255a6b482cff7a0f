// ── Router configuration snapshot ──
//
// `DeviceConfig` is an immutable value: every edit returns a new
// snapshot and leaves the receiver untouched. Committing a snapshot is a
// single reference swap in the store.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CoreError;
use crate::validation::FieldErrors;

use super::firewall::{FirewallRule, RuleEdit};
use super::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NtpConfig {
    pub enabled: bool,
    pub primary_server: String,
    pub secondary_server: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    pub primary_server: String,
    pub secondary_server: String,
}

/// Everything the editor can change on one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub identity: String,
    pub system_date: NaiveDate,
    #[serde(with = "hms")]
    pub system_time: NaiveTime,
    pub ntp: NtpConfig,
    pub dns: DnsConfig,
    pub firewall_rules: Vec<FirewallRule>,
}

// ── Edits ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NtpEdit {
    Enabled(bool),
    PrimaryServer(String),
    SecondaryServer(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsEdit {
    PrimaryServer(String),
    SecondaryServer(String),
}

/// One local mutation of a [`DeviceConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEdit {
    Identity(String),
    SystemDate(NaiveDate),
    SystemTime(NaiveTime),
    Ntp(NtpEdit),
    Dns(DnsEdit),
    ToggleRule { rule_id: EntityId, enabled: bool },
    RuleField { rule_id: EntityId, edit: RuleEdit },
}

/// Top-level section of a config, used to report what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigSection {
    Identity,
    Clock,
    Ntp,
    Dns,
    FirewallRules,
}

impl DeviceConfig {
    /// Apply one edit, returning the new snapshot.
    ///
    /// While NTP is disabled its server fields are inert: editing them is
    /// refused and their values are kept for when NTP is re-enabled.
    pub fn apply_edit(&self, edit: ConfigEdit) -> Result<Self, CoreError> {
        let mut next = self.clone();
        match edit {
            ConfigEdit::Identity(identity) => {
                let identity = identity.trim().to_owned();
                if identity.is_empty() {
                    return Err(FieldErrors::single("identity", "Router identity is required"));
                }
                next.identity = identity;
            }
            ConfigEdit::SystemDate(date) => next.system_date = date,
            ConfigEdit::SystemTime(time) => next.system_time = time,
            ConfigEdit::Ntp(NtpEdit::Enabled(enabled)) => next.ntp.enabled = enabled,
            ConfigEdit::Ntp(NtpEdit::PrimaryServer(server)) => {
                self.ensure_ntp_editable("ntp.primary_server")?;
                next.ntp.primary_server = server.trim().to_owned();
            }
            ConfigEdit::Ntp(NtpEdit::SecondaryServer(server)) => {
                self.ensure_ntp_editable("ntp.secondary_server")?;
                next.ntp.secondary_server = server.trim().to_owned();
            }
            ConfigEdit::Dns(DnsEdit::PrimaryServer(server)) => {
                next.dns.primary_server = server.trim().to_owned();
            }
            ConfigEdit::Dns(DnsEdit::SecondaryServer(server)) => {
                next.dns.secondary_server = server.trim().to_owned();
            }
            ConfigEdit::ToggleRule { rule_id, enabled } => {
                let idx = self.rule_index(&rule_id)?;
                next.firewall_rules[idx].enabled = enabled;
            }
            ConfigEdit::RuleField { rule_id, edit } => {
                let idx = self.rule_index(&rule_id)?;
                next.firewall_rules[idx] = self.firewall_rules[idx].with_edit(edit);
            }
        }
        Ok(next)
    }

    /// Sections whose values differ from `other`.
    pub fn changed_sections(&self, other: &Self) -> Vec<ConfigSection> {
        let mut sections = Vec::new();
        if self.identity != other.identity {
            sections.push(ConfigSection::Identity);
        }
        if self.system_date != other.system_date || self.system_time != other.system_time {
            sections.push(ConfigSection::Clock);
        }
        if self.ntp != other.ntp {
            sections.push(ConfigSection::Ntp);
        }
        if self.dns != other.dns {
            sections.push(ConfigSection::Dns);
        }
        if self.firewall_rules != other.firewall_rules {
            sections.push(ConfigSection::FirewallRules);
        }
        sections
    }

    pub fn rule(&self, rule_id: &EntityId) -> Option<&FirewallRule> {
        self.firewall_rules.iter().find(|r| &r.id == rule_id)
    }

    fn rule_index(&self, rule_id: &EntityId) -> Result<usize, CoreError> {
        self.firewall_rules
            .iter()
            .position(|r| &r.id == rule_id)
            .ok_or_else(|| CoreError::not_found("firewall rule", rule_id))
    }

    fn ensure_ntp_editable(&self, field: &str) -> Result<(), CoreError> {
        if self.ntp.enabled {
            Ok(())
        } else {
            Err(FieldErrors::single(field, "NTP client is disabled"))
        }
    }
}

/// `HH:MM:SS` without fractional seconds, the way routers print it.
mod hms {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M:%S";

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::firewall::{FirewallAction, FirewallProtocol};
    use pretty_assertions::assert_eq;

    fn rule(id: &str, name: &str) -> FirewallRule {
        FirewallRule {
            id: EntityId::from(id),
            name: name.into(),
            action: FirewallAction::Accept,
            protocol: FirewallProtocol::Any,
            source_address: None,
            destination_port: None,
            enabled: true,
        }
    }

    fn config() -> DeviceConfig {
        DeviceConfig {
            identity: "Main-POP-Router".into(),
            system_date: NaiveDate::from_ymd_opt(2024, 7, 30).unwrap(),
            system_time: NaiveTime::from_hms_opt(10, 15, 30).unwrap(),
            ntp: NtpConfig {
                enabled: true,
                primary_server: "time.google.com".into(),
                secondary_server: "pool.ntp.org".into(),
            },
            dns: DnsConfig {
                primary_server: "8.8.8.8".into(),
                secondary_server: "8.8.4.4".into(),
            },
            firewall_rules: vec![rule("fw1", "a"), rule("fw2", "b"), rule("fw3", "c")],
        }
    }

    fn ids(cfg: &DeviceConfig) -> Vec<String> {
        cfg.firewall_rules.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn toggling_rules_never_reorders() {
        let base = config();
        let mut cfg = base.clone();
        for (id, enabled) in [("fw2", false), ("fw1", false), ("fw3", false), ("fw2", true)] {
            cfg = cfg
                .apply_edit(ConfigEdit::ToggleRule {
                    rule_id: EntityId::from(id),
                    enabled,
                })
                .unwrap();
        }
        assert_eq!(ids(&cfg), ids(&base));
        assert!(cfg.rule(&EntityId::from("fw2")).unwrap().enabled);
        assert!(!cfg.rule(&EntityId::from("fw1")).unwrap().enabled);
    }

    #[test]
    fn ntp_disable_then_enable_restores_servers() {
        let cfg = config()
            .apply_edit(ConfigEdit::Ntp(NtpEdit::Enabled(false)))
            .unwrap()
            .apply_edit(ConfigEdit::Ntp(NtpEdit::Enabled(true)))
            .unwrap();
        assert_eq!(cfg.ntp.primary_server, "time.google.com");
        assert_eq!(cfg.ntp.secondary_server, "pool.ntp.org");
    }

    #[test]
    fn ntp_servers_are_inert_while_disabled() {
        let disabled = config()
            .apply_edit(ConfigEdit::Ntp(NtpEdit::Enabled(false)))
            .unwrap();
        let result = disabled.apply_edit(ConfigEdit::Ntp(NtpEdit::PrimaryServer("x".into())));
        let Err(CoreError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("ntp.primary_server"), Some("NTP client is disabled"));
        assert_eq!(disabled.ntp.primary_server, "time.google.com");
    }

    #[test]
    fn edits_do_not_touch_the_source_snapshot() {
        let base = config();
        let edited = base
            .apply_edit(ConfigEdit::Dns(DnsEdit::PrimaryServer("1.1.1.1".into())))
            .unwrap();
        assert_eq!(base.dns.primary_server, "8.8.8.8");
        assert_eq!(edited.dns.primary_server, "1.1.1.1");
        assert_eq!(edited.changed_sections(&base), vec![ConfigSection::Dns]);
    }

    #[test]
    fn unknown_rule_is_not_found() {
        let result = config().apply_edit(ConfigEdit::RuleField {
            rule_id: EntityId::from("fw9"),
            edit: RuleEdit::Name("x".into()),
        });
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn blank_identity_is_rejected() {
        let result = config().apply_edit(ConfigEdit::Identity("  ".into()));
        assert!(matches!(result, Err(CoreError::Validation(_))));
    }

    #[test]
    fn time_serializes_without_fraction() {
        let json = serde_json::to_value(config()).unwrap();
        assert_eq!(json["systemTime"], "10:15:30");
        assert_eq!(json["systemDate"], "2024-07-30");
        let back: DeviceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config());
    }
}
