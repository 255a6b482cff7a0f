// ── RouterOS API backend ──
//
// Opens one authenticated API connection per operation. Conversions
// between router rows and domain types live here so ispdesk-api stays
// free of business rules.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{NaiveDate, NaiveTime};
use ispdesk_api::routeros::{
    ActiveSession, ClockReading, ConnectConfig, FilterRuleEntry, FilterRuleUpdate,
    NtpClientSettings, RouterOsClient, RouterOsMajor, SessionSource,
};
use tracing::{debug, info, warn};

use super::{KickOutcome, ProbeReport};
use crate::error::CoreError;
use crate::model::{
    ConfigSection, DeviceConfig, DeviceRecord, DnsConfig, EntityId, FirewallAction,
    FirewallProtocol, FirewallRule, MacAddress, NtpConfig, OnlineClientSession,
};

/// Talks to real routers over the binary API.
#[derive(Debug, Clone, Default)]
pub struct RouterOsConnector;

impl RouterOsConnector {
    pub fn new() -> Self {
        Self
    }

    async fn open(&self, device: &DeviceRecord) -> Result<RouterOsClient, CoreError> {
        let config = ConnectConfig {
            host: device.host.clone(),
            port: device.api_port,
            username: device.username.clone(),
            password: device.password.clone(),
            connect_timeout: device.timeout(),
        };
        Ok(RouterOsClient::open(&config).await?)
    }

    pub(super) async fn probe(&self, device: &DeviceRecord) -> Result<ProbeReport, CoreError> {
        let started = Instant::now();
        let mut client = self.open(device).await?;
        let resource = client.resource().await?;
        let latency = started.elapsed();
        close_quietly(client).await;
        Ok(ProbeReport {
            latency,
            detail: format!("RouterOS {} on {}", resource.version, resource.board_name),
        })
    }

    pub(super) async fn fetch_config(
        &self,
        device: &DeviceRecord,
    ) -> Result<DeviceConfig, CoreError> {
        let major = device.protocol_version.into();
        let mut client = self.open(device).await?;
        let snapshot = DeviceSnapshot::read(&mut client, major).await?;
        close_quietly(client).await;
        snapshot.to_config()
    }

    /// Push every section that differs from `baseline`, in order. The
    /// device state is read first; on failure every step already sent is
    /// restored from that reading.
    ///
    /// The device deadline covers the forward pass only. When it expires
    /// midway, the restore runs on a fresh connection under its own
    /// deadline before `Timeout` is reported.
    pub(super) async fn apply_config(
        &self,
        device: &DeviceRecord,
        baseline: &DeviceConfig,
        desired: &DeviceConfig,
    ) -> Result<(), CoreError> {
        let sections = desired.changed_sections(baseline);
        if sections.is_empty() {
            debug!(device = %device.name, "nothing to apply");
            return Ok(());
        }

        let major: RouterOsMajor = device.protocol_version.into();
        let mut before: Option<DeviceSnapshot> = None;
        let mut written = Vec::new();

        let forward = tokio::time::timeout(device.timeout(), async {
            let mut client = self.open(device).await?;
            let snapshot: &DeviceSnapshot =
                before.insert(DeviceSnapshot::read(&mut client, major).await?);
            let plan = Plan {
                major,
                before: snapshot,
                baseline,
                desired,
            };
            match plan.push(&mut client, &sections, &mut written).await {
                Ok(()) => {
                    close_quietly(client).await;
                    Ok::<(), CoreError>(())
                }
                Err(err) => {
                    warn!(
                        device = %device.name,
                        error = %err,
                        steps = written.len(),
                        "apply failed, rolling back"
                    );
                    rollback(&mut client, major, snapshot, &written).await;
                    close_quietly(client).await;
                    Err(CoreError::from(err))
                }
            }
        })
        .await;

        match forward {
            Ok(Ok(())) => {
                info!(device = %device.name, ?sections, "config applied");
                Ok(())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                if let Some(snapshot) = before.as_ref().filter(|_| !written.is_empty()) {
                    warn!(
                        device = %device.name,
                        steps = written.len(),
                        "apply timed out, rolling back"
                    );
                    self.rollback_fresh(device, major, snapshot, &written).await;
                }
                Err(CoreError::Timeout {
                    device: device.name.clone(),
                    timeout_secs: u64::from(device.timeout_seconds),
                })
            }
        }
    }

    /// Restore on a new connection: the old one may still have a write
    /// in flight whose reply would be read as ours.
    async fn rollback_fresh(
        &self,
        device: &DeviceRecord,
        major: RouterOsMajor,
        before: &DeviceSnapshot,
        written: &[Written],
    ) {
        let restore = tokio::time::timeout(device.timeout(), async {
            let mut client = self.open(device).await?;
            rollback(&mut client, major, before, written).await;
            close_quietly(client).await;
            Ok::<_, CoreError>(())
        })
        .await;
        match restore {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(device = %device.name, error = %e, "rollback could not connect"),
            Err(_) => warn!(device = %device.name, "rollback timed out"),
        }
    }

    pub(super) async fn list_sessions(
        &self,
        device: &DeviceRecord,
    ) -> Result<Vec<OnlineClientSession>, CoreError> {
        let mut client = self.open(device).await?;
        let sessions = client.active_sessions().await?;
        let rates: HashMap<String, (u64, u64)> = client
            .queue_rates()
            .await?
            .into_iter()
            .map(|q| (q.name, (q.download_bps, q.upload_bps)))
            .collect();
        close_quietly(client).await;

        Ok(sessions
            .into_iter()
            .map(|s| to_session(device, s, &rates))
            .collect())
    }

    pub(super) async fn kick(
        &self,
        device: &DeviceRecord,
        session: &OnlineClientSession,
    ) -> Result<KickOutcome, CoreError> {
        let Some((source, router_id)) = parse_session_id(&session.id) else {
            debug!(session = %session.id, "session id did not come from this router");
            return Ok(KickOutcome::AlreadyGone);
        };

        let mut client = self.open(device).await?;
        let result = client.remove_session(source, router_id).await;
        close_quietly(client).await;

        match result {
            Ok(()) => Ok(KickOutcome::Disconnected),
            Err(e) if e.is_not_found() => Ok(KickOutcome::AlreadyGone),
            Err(e) => Err(e.into()),
        }
    }
}

async fn close_quietly(client: RouterOsClient) {
    if let Err(e) = client.close().await {
        debug!(error = %e, "error closing API connection");
    }
}

// ── Device state ────────────────────────────────────────────────────

/// Raw device state, kept verbatim so a rollback restores exactly what
/// was read.
struct DeviceSnapshot {
    identity: String,
    clock: ClockReading,
    ntp: NtpClientSettings,
    dns: Vec<String>,
    rules: Vec<FilterRuleEntry>,
}

impl DeviceSnapshot {
    async fn read(
        client: &mut RouterOsClient,
        major: RouterOsMajor,
    ) -> Result<Self, ispdesk_api::Error> {
        Ok(Self {
            identity: client.identity().await?,
            clock: client.clock().await?,
            ntp: client.ntp_client(major).await?,
            dns: client.dns_servers().await?,
            rules: client.filter_rules().await?,
        })
    }

    fn to_config(&self) -> Result<DeviceConfig, CoreError> {
        let system_date = parse_router_date(&self.clock.date)?;
        let system_time = NaiveTime::parse_from_str(&self.clock.time, "%H:%M:%S")
            .map_err(|e| CoreError::Internal(format!("unreadable clock time: {e}")))?;
        let nth = |list: &[String], i: usize| list.get(i).cloned().unwrap_or_default();

        Ok(DeviceConfig {
            identity: self.identity.clone(),
            system_date,
            system_time,
            ntp: NtpConfig {
                enabled: self.ntp.enabled,
                primary_server: nth(&self.ntp.servers, 0),
                secondary_server: nth(&self.ntp.servers, 1),
            },
            dns: DnsConfig {
                primary_server: nth(&self.dns, 0),
                secondary_server: nth(&self.dns, 1),
            },
            firewall_rules: self.rules.iter().filter_map(to_rule).collect(),
        })
    }

    fn rule(&self, id: &str) -> Option<&FilterRuleEntry> {
        self.rules.iter().find(|r| r.id == id)
    }
}

/// v7 prints ISO dates, v6 prints `jul/30/2024`.
fn parse_router_date(raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%b/%d/%Y"))
        .map_err(|e| CoreError::Internal(format!("unreadable clock date '{raw}': {e}")))
}

fn format_router_date(date: NaiveDate, major: RouterOsMajor) -> String {
    match major {
        RouterOsMajor::V7 => date.format("%Y-%m-%d").to_string(),
        RouterOsMajor::V6 => date.format("%b/%d/%Y").to_string().to_lowercase(),
    }
}

/// Map a router rule into the console's model. Rules using actions or
/// protocols the console cannot express are left out and never touched.
fn to_rule(entry: &FilterRuleEntry) -> Option<FirewallRule> {
    let action = entry.action.parse::<FirewallAction>().ok().or_else(|| {
        debug!(rule = %entry.id, action = %entry.action, "skipping rule with unsupported action");
        None
    })?;
    let protocol = match entry.protocol.as_deref() {
        None => FirewallProtocol::Any,
        Some(p) => p.parse::<FirewallProtocol>().ok().or_else(|| {
            debug!(rule = %entry.id, protocol = p, "skipping rule with unsupported protocol");
            None
        })?,
    };
    Some(FirewallRule {
        id: EntityId::from(entry.id.as_str()),
        name: entry
            .comment
            .clone()
            .unwrap_or_else(|| format!("{} {}", entry.chain, entry.action)),
        action,
        protocol,
        source_address: entry.src_address.clone(),
        destination_port: entry.dst_port.clone(),
        enabled: !entry.disabled,
    })
}

/// The comment is only sent when the rule was renamed, so a name the
/// console made up for an uncommented rule never reaches the router.
fn to_update(rule: &FirewallRule, loaded: Option<&FirewallRule>) -> FilterRuleUpdate {
    FilterRuleUpdate {
        id: rule.id.to_string(),
        action: rule.action.to_string(),
        protocol: match rule.protocol {
            FirewallProtocol::Any => None,
            other => Some(other.to_string()),
        },
        src_address: rule.source_address.clone(),
        dst_port: rule.destination_port.clone(),
        comment: match loaded {
            Some(loaded) if loaded.name == rule.name => None,
            _ => Some(rule.name.clone()),
        },
        disabled: !rule.enabled,
    }
}

fn restore_update(entry: &FilterRuleEntry) -> FilterRuleUpdate {
    FilterRuleUpdate {
        id: entry.id.clone(),
        action: entry.action.clone(),
        protocol: entry.protocol.clone(),
        src_address: entry.src_address.clone(),
        dst_port: entry.dst_port.clone(),
        comment: Some(entry.comment.clone().unwrap_or_default()),
        disabled: entry.disabled,
    }
}

fn servers(primary: &str, secondary: &str) -> Vec<String> {
    [primary, secondary]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ── Transaction ─────────────────────────────────────────────────────

/// One step sent to the device. Recorded before the write so a step
/// that fails halfway is restored too.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Written {
    Identity,
    Clock,
    Ntp,
    Dns,
    Rule(String),
}

struct Plan<'a> {
    major: RouterOsMajor,
    before: &'a DeviceSnapshot,
    baseline: &'a DeviceConfig,
    desired: &'a DeviceConfig,
}

impl Plan<'_> {
    async fn push(
        &self,
        client: &mut RouterOsClient,
        sections: &[ConfigSection],
        written: &mut Vec<Written>,
    ) -> Result<(), ispdesk_api::Error> {
        let desired = self.desired;
        for section in sections {
            match section {
                ConfigSection::Identity => {
                    written.push(Written::Identity);
                    client.set_identity(&desired.identity).await?;
                }
                ConfigSection::Clock => {
                    let date = format_router_date(desired.system_date, self.major);
                    let time = desired.system_time.format("%H:%M:%S").to_string();
                    written.push(Written::Clock);
                    client.set_clock(&date, &time).await?;
                }
                ConfigSection::Ntp => {
                    let ntp = &desired.ntp;
                    let settings = NtpClientSettings {
                        enabled: ntp.enabled,
                        servers: servers(&ntp.primary_server, &ntp.secondary_server),
                    };
                    written.push(Written::Ntp);
                    client.set_ntp_client(self.major, &settings).await?;
                }
                ConfigSection::Dns => {
                    let dns = &desired.dns;
                    let list = servers(&dns.primary_server, &dns.secondary_server);
                    written.push(Written::Dns);
                    client.set_dns_servers(&list).await?;
                }
                ConfigSection::FirewallRules => self.push_rules(client, written).await?,
            }
        }
        Ok(())
    }

    /// Only rules that changed since load are sent.
    async fn push_rules(
        &self,
        client: &mut RouterOsClient,
        written: &mut Vec<Written>,
    ) -> Result<(), ispdesk_api::Error> {
        for rule in &self.desired.firewall_rules {
            let loaded = self.baseline.rule(&rule.id);
            if loaded == Some(rule) {
                continue;
            }
            let id = rule.id.to_string();
            if self.before.rule(&id).is_none() {
                return Err(ispdesk_api::Error::Trap {
                    category: None,
                    message: format!("no such item: firewall rule {id}"),
                });
            }
            written.push(Written::Rule(id));
            client.update_filter_rule(&to_update(rule, loaded)).await?;
        }
        Ok(())
    }
}

/// Best effort: every restore is attempted even if an earlier one fails.
async fn rollback(
    client: &mut RouterOsClient,
    major: RouterOsMajor,
    before: &DeviceSnapshot,
    written: &[Written],
) {
    for step in written.iter().rev() {
        let result = match step {
            Written::Identity => client.set_identity(&before.identity).await,
            Written::Clock => client.set_clock(&before.clock.date, &before.clock.time).await,
            Written::Ntp => client.set_ntp_client(major, &before.ntp).await,
            Written::Dns => client.set_dns_servers(&before.dns).await,
            Written::Rule(id) => match before.rule(id) {
                Some(entry) => client.update_filter_rule(&restore_update(entry)).await,
                None => Ok(()),
            },
        };
        if let Err(e) = result {
            warn!(?step, error = %e, "rollback step failed");
        }
    }
}

// ── Sessions ────────────────────────────────────────────────────────

fn to_session(
    device: &DeviceRecord,
    session: ActiveSession,
    rates: &HashMap<String, (u64, u64)>,
) -> OnlineClientSession {
    let queue = format!("<{}-{}>", queue_prefix(session.source), session.username);
    let (down, up) = rates
        .get(&queue)
        .or_else(|| rates.get(&session.username))
        .copied()
        .unwrap_or_default();
    OnlineClientSession {
        id: EntityId::from(format!("{}:{}", session.source.prefix(), session.id)),
        device_id: Some(device.id.clone()),
        username: session.username,
        ip_address: session.address,
        mac_address: session.mac.map(MacAddress::new).unwrap_or_default(),
        server: device.name.clone(),
        uptime: spaced_uptime(&session.uptime),
        download_speed: mbps(down),
        upload_speed: mbps(up),
    }
}

fn queue_prefix(source: SessionSource) -> &'static str {
    match source {
        SessionSource::Ppp => "pppoe",
        SessionSource::Hotspot => "hotspot",
    }
}

/// `ppp:*1A` -> (Ppp, `*1A`).
fn parse_session_id(id: &EntityId) -> Option<(SessionSource, &str)> {
    let (prefix, router_id) = id.as_legacy()?.split_once(':')?;
    Some((SessionSource::from_prefix(prefix)?, router_id))
}

/// `1d4h30m` -> `1d 4h 30m`.
fn spaced_uptime(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_alpha = false;
    for c in raw.chars() {
        if c.is_ascii_digit() && prev_alpha {
            out.push(' ');
        }
        prev_alpha = c.is_ascii_alphabetic();
        out.push(c);
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn mbps(bps: u64) -> String {
    format!("{:.1} Mbps", bps as f64 / 1_000_000.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(id: &str, action: &str, protocol: Option<&str>) -> FilterRuleEntry {
        FilterRuleEntry {
            id: id.into(),
            chain: "input".into(),
            action: action.into(),
            protocol: protocol.map(str::to_owned),
            src_address: None,
            dst_port: Some("8291".into()),
            comment: Some("Allow Winbox".into()),
            disabled: false,
        }
    }

    #[test]
    fn v6_dates_parse_and_format_lowercase() {
        let date = parse_router_date("jul/30/2024").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 7, 30).unwrap());
        assert_eq!(format_router_date(date, RouterOsMajor::V6), "jul/30/2024");
        assert_eq!(format_router_date(date, RouterOsMajor::V7), "2024-07-30");
    }

    #[test]
    fn unsupported_rules_are_skipped() {
        assert!(to_rule(&entry("*1", "jump", Some("tcp"))).is_none());
        assert!(to_rule(&entry("*2", "accept", Some("gre"))).is_none());
        let rule = to_rule(&entry("*3", "accept", None)).unwrap();
        assert_eq!(rule.protocol, FirewallProtocol::Any);
        assert_eq!(rule.name, "Allow Winbox");
    }

    #[test]
    fn any_protocol_is_sent_as_unset() {
        let rule = to_rule(&entry("*3", "drop", None)).unwrap();
        let update = to_update(&rule, None);
        assert_eq!(update.protocol, None);
        assert_eq!(update.action, "drop");
    }

    #[test]
    fn display_name_of_uncommented_rule_is_not_written_back() {
        let uncommented = FilterRuleEntry {
            comment: None,
            ..entry("*5", "accept", Some("tcp"))
        };
        let loaded = to_rule(&uncommented).unwrap();
        assert_eq!(loaded.name, "input accept");

        let toggled = FirewallRule {
            enabled: false,
            ..loaded.clone()
        };
        let update = to_update(&toggled, Some(&loaded));
        assert_eq!(update.comment, None);
        assert!(update.disabled);

        let renamed = FirewallRule {
            name: "Allow SSH".into(),
            ..loaded.clone()
        };
        assert_eq!(to_update(&renamed, Some(&loaded)).comment.as_deref(), Some("Allow SSH"));
    }

    #[test]
    fn session_ids_round_trip_through_prefix() {
        let id = EntityId::from("hotspot:*2B");
        let (source, router_id) = parse_session_id(&id).unwrap();
        assert_eq!(source, SessionSource::Hotspot);
        assert_eq!(router_id, "*2B");
        assert!(parse_session_id(&EntityId::from("cl1")).is_none());
    }

    #[test]
    fn uptime_gets_spaces_between_units() {
        assert_eq!(spaced_uptime("1d4h30m"), "1d 4h 30m");
        assert_eq!(spaced_uptime("2h15m"), "2h 15m");
    }

    #[test]
    fn rates_render_in_megabits() {
        assert_eq!(mbps(12_500_000), "12.5 Mbps");
        assert_eq!(mbps(0), "0.0 Mbps");
    }
}
