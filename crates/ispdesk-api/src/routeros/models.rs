// Typed views over RouterOS menu rows.
//
// Fields mirror what the router reports; interpretation (dates, speeds,
// MAC normalisation) happens in ispdesk-core.

use super::reply::Attributes;

/// Firmware generation. Some menus changed shape between 6.x and 7.x.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterOsMajor {
    V6,
    V7,
}

/// `/system/clock` reading, in the router's own text format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockReading {
    pub date: String,
    pub time: String,
}

/// `/system/ntp/client` settings, normalised across firmware generations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NtpClientSettings {
    pub enabled: bool,
    /// Ordered: primary first.
    pub servers: Vec<String>,
}

/// One `/ip/firewall/filter` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRuleEntry {
    /// Internal `.id` (`*1A`).
    pub id: String,
    pub chain: String,
    pub action: String,
    pub protocol: Option<String>,
    pub src_address: Option<String>,
    pub dst_port: Option<String>,
    pub comment: Option<String>,
    pub disabled: bool,
}

impl FilterRuleEntry {
    pub(crate) fn from_attrs(attrs: &Attributes) -> Option<Self> {
        Some(Self {
            id: attrs.text(".id")?,
            chain: attrs.text("chain").unwrap_or_default(),
            action: attrs.text("action").unwrap_or_else(|| "accept".into()),
            protocol: attrs.text("protocol"),
            src_address: attrs.text("src-address"),
            dst_port: attrs.text("dst-port"),
            comment: attrs.text("comment"),
            disabled: attrs.flag("disabled"),
        })
    }
}

/// Desired state for an existing filter rule. A `None` matcher is cleared;
/// a `None` comment is left as the router has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRuleUpdate {
    pub id: String,
    pub action: String,
    pub protocol: Option<String>,
    pub src_address: Option<String>,
    pub dst_port: Option<String>,
    pub comment: Option<String>,
    pub disabled: bool,
}

/// Which menu an active session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionSource {
    Ppp,
    Hotspot,
}

impl SessionSource {
    pub fn menu(self) -> &'static str {
        match self {
            Self::Ppp => "/ppp/active",
            Self::Hotspot => "/ip/hotspot/active",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Ppp => "ppp",
            Self::Hotspot => "hotspot",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "ppp" => Some(Self::Ppp),
            "hotspot" => Some(Self::Hotspot),
            _ => None,
        }
    }
}

/// A connected subscriber (PPPoE or Hotspot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub source: SessionSource,
    pub id: String,
    pub username: String,
    pub address: String,
    pub mac: Option<String>,
    pub uptime: String,
}

impl ActiveSession {
    pub(crate) fn from_ppp(attrs: &Attributes) -> Option<Self> {
        Some(Self {
            source: SessionSource::Ppp,
            id: attrs.text(".id")?,
            username: attrs.text("name").unwrap_or_default(),
            address: attrs.text("address").unwrap_or_default(),
            // PPPoE reports the client MAC as the caller id.
            mac: attrs.text("caller-id"),
            uptime: attrs.text("uptime").unwrap_or_default(),
        })
    }

    pub(crate) fn from_hotspot(attrs: &Attributes) -> Option<Self> {
        Some(Self {
            source: SessionSource::Hotspot,
            id: attrs.text(".id")?,
            username: attrs.text("user").unwrap_or_default(),
            address: attrs.text("address").unwrap_or_default(),
            mac: attrs.text("mac-address"),
            uptime: attrs.text("uptime").unwrap_or_default(),
        })
    }
}

/// Current rate of a `/queue/simple` entry, in bits per second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRate {
    pub name: String,
    pub upload_bps: u64,
    pub download_bps: u64,
}

impl QueueRate {
    pub(crate) fn from_attrs(attrs: &Attributes) -> Option<Self> {
        let name = attrs.text("name")?;
        let (up, down) = attrs.get("rate")?.split_once('/')?;
        Some(Self {
            name,
            upload_bps: up.parse().ok()?,
            download_bps: down.parse().ok()?,
        })
    }
}

/// `/system/resource` summary, used as the reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemResource {
    pub version: String,
    pub board_name: String,
    pub uptime: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn queue_rate_parses_upload_download_pair() {
        let attrs = Attributes::from_pairs([("name", "<pppoe-john>"), ("rate", "2100000/12500000")]);
        let rate = QueueRate::from_attrs(&attrs).unwrap();
        assert_eq!(rate.upload_bps, 2_100_000);
        assert_eq!(rate.download_bps, 12_500_000);
    }

    #[test]
    fn ppp_session_uses_caller_id_as_mac() {
        let attrs = Attributes::from_pairs([
            (".id", "*8"),
            ("name", "john.doe"),
            ("caller-id", "AA:BB:CC:11:22:33"),
            ("address", "10.5.50.112"),
            ("uptime", "2h15m"),
        ]);
        let session = ActiveSession::from_ppp(&attrs).unwrap();
        assert_eq!(session.mac.as_deref(), Some("AA:BB:CC:11:22:33"));
        assert_eq!(session.source, SessionSource::Ppp);
    }

    #[test]
    fn rows_without_id_are_skipped() {
        let attrs = Attributes::from_pairs([("chain", "input")]);
        assert!(FilterRuleEntry::from_attrs(&attrs).is_none());
    }
}
