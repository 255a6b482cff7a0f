// ── Online client sessions ──

use serde::{Deserialize, Serialize};

use super::{EntityId, MacAddress};

/// A connected end-user session as reported by a router.
///
/// `device_id` names the router that reported it. Rows saved before the
/// id was recorded only carry the `server` display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineClientSession {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<EntityId>,
    pub username: String,
    pub ip_address: String,
    pub mac_address: MacAddress,
    pub server: String,
    pub uptime: String,
    pub download_speed: String,
    pub upload_speed: String,
}

impl OnlineClientSession {
    /// Case-insensitive substring match against every displayed field.
    /// Only the empty string matches everything; whitespace is searched
    /// for like any other character.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let needle = needle.to_lowercase();
        let id = self.id.to_string();
        [
            self.username.as_str(),
            self.ip_address.as_str(),
            self.mac_address.as_str(),
            self.server.as_str(),
            self.uptime.as_str(),
            self.download_speed.as_str(),
            self.upload_speed.as_str(),
            id.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}
