// ── Core identity types ──
//
// EntityId and MacAddress are shared by every record. Freshly created
// records get UUIDs; demo data and router-native ids (`*1A`) keep their
// original strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ── EntityId ────────────────────────────────────────────────────────

/// Identifier for any stored record.
///
/// Wraps either a generated UUID or a legacy string id such as
/// `MKT001`, `CUST-IMP-6` or a RouterOS `.id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Uuid(Uuid),
    Legacy(String),
}

impl EntityId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self::Uuid(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Option<&Uuid> {
        match self {
            Self::Uuid(u) => Some(u),
            Self::Legacy(_) => None,
        }
    }

    pub fn as_legacy(&self) -> Option<&str> {
        match self {
            Self::Legacy(s) => Some(s),
            Self::Uuid(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Legacy(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_owned()))
    }
}

impl From<Uuid> for EntityId {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        match Uuid::parse_str(&s) {
            Ok(u) => Self::Uuid(u),
            Err(_) => Self::Legacy(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, displayed as upper-case colon-separated (AA:BB:CC:DD:EE:FF).
///
/// Router caller-ids sometimes arrive lower-case or dash-separated; both
/// normalise to the same value so comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase().replace('-', ":"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_from_uuid_string() {
        let id = EntityId::from("550e8400-e29b-41d4-a716-446655440000");
        assert!(id.as_uuid().is_some());
    }

    #[test]
    fn entity_id_keeps_demo_ids_verbatim() {
        let id: EntityId = "MKT001".parse().unwrap();
        assert_eq!(id.as_legacy(), Some("MKT001"));
        assert_eq!(id.to_string(), "MKT001");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(EntityId::generate(), EntityId::generate());
    }

    #[test]
    fn entity_id_serializes_as_plain_string() {
        let id = EntityId::from("cl1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cl1\"");
    }

    #[test]
    fn mac_address_normalizes_dashes_and_case() {
        let mac = MacAddress::new("aa-bb-cc-11-22-33");
        assert_eq!(mac.as_str(), "AA:BB:CC:11:22:33");
        assert_eq!(mac, MacAddress::new("AA:BB:CC:11:22:33"));
    }

    #[test]
    fn mac_address_round_trips_through_serde() {
        let mac: MacAddress = serde_json::from_str("\"aa:bb:cc:11:22:33\"").unwrap();
        assert_eq!(mac.to_string(), "AA:BB:CC:11:22:33");
    }
}
