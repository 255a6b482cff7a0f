// ── Firewall filter rules ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FirewallAction {
    Accept,
    Drop,
    Reject,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FirewallProtocol {
    Tcp,
    Udp,
    Icmp,
    #[default]
    Any,
}

/// One filter rule. Position in the owning list is the evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallRule {
    pub id: EntityId,
    pub name: String,
    pub action: FirewallAction,
    pub protocol: FirewallProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,
    pub enabled: bool,
}

/// Single-field change to a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEdit {
    Name(String),
    Action(FirewallAction),
    Protocol(FirewallProtocol),
    /// `None` or blank clears the matcher.
    SourceAddress(Option<String>),
    DestinationPort(Option<String>),
}

impl FirewallRule {
    /// Return a copy with one field changed.
    pub(crate) fn with_edit(&self, edit: RuleEdit) -> Self {
        let mut rule = self.clone();
        match edit {
            RuleEdit::Name(name) => rule.name = name,
            RuleEdit::Action(action) => rule.action = action,
            RuleEdit::Protocol(protocol) => rule.protocol = protocol,
            RuleEdit::SourceAddress(addr) => rule.source_address = non_blank(addr),
            RuleEdit::DestinationPort(port) => rule.destination_port = non_blank(port),
        }
        rule
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn winbox() -> FirewallRule {
        FirewallRule {
            id: EntityId::from("fw1"),
            name: "Allow Winbox".into(),
            action: FirewallAction::Accept,
            protocol: FirewallProtocol::Tcp,
            source_address: None,
            destination_port: Some("8291".into()),
            enabled: true,
        }
    }

    #[test]
    fn blank_matcher_clears_field() {
        let rule = winbox().with_edit(RuleEdit::DestinationPort(Some("  ".into())));
        assert_eq!(rule.destination_port, None);
    }

    #[test]
    fn edit_leaves_original_untouched() {
        let original = winbox();
        let edited = original.with_edit(RuleEdit::Action(FirewallAction::Drop));
        assert_eq!(original.action, FirewallAction::Accept);
        assert_eq!(edited.action, FirewallAction::Drop);
    }

    #[test]
    fn serde_uses_lowercase_enums_and_camel_case() {
        let json = serde_json::to_value(winbox()).unwrap();
        assert_eq!(json["action"], "accept");
        assert_eq!(json["destinationPort"], "8291");
        assert!(json.get("sourceAddress").is_none());
    }
}
