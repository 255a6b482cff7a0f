// Typed RouterOS menu operations on an open `RouterOsClient`.

use std::net::IpAddr;

use tracing::debug;

use crate::error::Error;

use super::client::RouterOsClient;
use super::codec::Sentence;
use super::models::{
    ActiveSession, ClockReading, FilterRuleEntry, FilterRuleUpdate, NtpClientSettings,
    QueueRate, RouterOsMajor, SessionSource, SystemResource,
};
use super::reply::Attributes;

/// RouterOS 6 stores an unset NTP address as the zero address.
const UNSET_V6_NTP: &str = "0.0.0.0";

impl RouterOsClient {
    // ── System ──────────────────────────────────────────────────────

    pub async fn identity(&mut self) -> Result<String, Error> {
        let rows = self.execute(Sentence::command("/system/identity/print")).await?;
        first_row(&rows, "/system/identity")?
            .text("name")
            .ok_or_else(|| missing("/system/identity", "name"))
    }

    pub async fn set_identity(&mut self, name: &str) -> Result<(), Error> {
        self.execute(Sentence::command("/system/identity/set").attr("name", name))
            .await
            .map(drop)
    }

    pub async fn clock(&mut self) -> Result<ClockReading, Error> {
        let rows = self.execute(Sentence::command("/system/clock/print")).await?;
        let row = first_row(&rows, "/system/clock")?;
        Ok(ClockReading {
            date: row.text("date").ok_or_else(|| missing("/system/clock", "date"))?,
            time: row.text("time").ok_or_else(|| missing("/system/clock", "time"))?,
        })
    }

    pub async fn set_clock(&mut self, date: &str, time: &str) -> Result<(), Error> {
        self.execute(
            Sentence::command("/system/clock/set")
                .attr("date", date)
                .attr("time", time),
        )
        .await
        .map(drop)
    }

    /// Reachability probe: cheap read that every firmware answers.
    pub async fn resource(&mut self) -> Result<SystemResource, Error> {
        let rows = self.execute(Sentence::command("/system/resource/print")).await?;
        let row = first_row(&rows, "/system/resource")?;
        Ok(SystemResource {
            version: row.text("version").unwrap_or_default(),
            board_name: row.text("board-name").unwrap_or_default(),
            uptime: row.text("uptime").unwrap_or_default(),
        })
    }

    // ── NTP client ──────────────────────────────────────────────────

    pub async fn ntp_client(&mut self, major: RouterOsMajor) -> Result<NtpClientSettings, Error> {
        let rows = self.execute(Sentence::command("/system/ntp/client/print")).await?;
        let row = first_row(&rows, "/system/ntp/client")?;

        let servers = match major {
            RouterOsMajor::V7 => split_list(row.get("servers")),
            RouterOsMajor::V6 => {
                let mut servers: Vec<String> = ["primary-ntp", "secondary-ntp"]
                    .iter()
                    .filter_map(|k| row.text(k))
                    .filter(|v| v != UNSET_V6_NTP)
                    .collect();
                servers.extend(split_list(row.get("server-dns-names")));
                servers
            }
        };

        Ok(NtpClientSettings {
            enabled: row.flag("enabled"),
            servers,
        })
    }

    pub async fn set_ntp_client(
        &mut self,
        major: RouterOsMajor,
        settings: &NtpClientSettings,
    ) -> Result<(), Error> {
        let enabled = if settings.enabled { "yes" } else { "no" };
        let mut sentence = Sentence::command("/system/ntp/client/set").attr("enabled", enabled);

        match major {
            RouterOsMajor::V7 => {
                sentence = sentence.attr("servers", settings.servers.join(","));
            }
            RouterOsMajor::V6 => {
                // Literal addresses go in the two address slots, names in the DNS list.
                let (addrs, names): (Vec<&String>, Vec<&String>) = settings
                    .servers
                    .iter()
                    .partition(|s| s.parse::<IpAddr>().is_ok());
                let primary = addrs.first().map_or(UNSET_V6_NTP, |s| s.as_str());
                let secondary = addrs.get(1).map_or(UNSET_V6_NTP, |s| s.as_str());
                let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
                sentence = sentence
                    .attr("primary-ntp", primary)
                    .attr("secondary-ntp", secondary)
                    .attr("server-dns-names", names.join(","));
            }
        }

        self.execute(sentence).await.map(drop)
    }

    // ── DNS ─────────────────────────────────────────────────────────

    pub async fn dns_servers(&mut self) -> Result<Vec<String>, Error> {
        let rows = self.execute(Sentence::command("/ip/dns/print")).await?;
        Ok(split_list(first_row(&rows, "/ip/dns")?.get("servers")))
    }

    pub async fn set_dns_servers(&mut self, servers: &[String]) -> Result<(), Error> {
        self.execute(Sentence::command("/ip/dns/set").attr("servers", servers.join(",")))
            .await
            .map(drop)
    }

    // ── Firewall ────────────────────────────────────────────────────

    /// Filter rules in evaluation order.
    pub async fn filter_rules(&mut self) -> Result<Vec<FilterRuleEntry>, Error> {
        let rows = self.execute(Sentence::command("/ip/firewall/filter/print")).await?;
        Ok(rows
            .iter()
            .filter(|r| !r.flag("dynamic"))
            .filter_map(FilterRuleEntry::from_attrs)
            .collect())
    }

    /// Push the desired state of one rule. Cleared matchers are unset.
    pub async fn update_filter_rule(&mut self, update: &FilterRuleUpdate) -> Result<(), Error> {
        let mut set = Sentence::command("/ip/firewall/filter/set")
            .attr(".id", &update.id)
            .attr("action", &update.action)
            .attr("disabled", if update.disabled { "yes" } else { "no" });
        if let Some(comment) = &update.comment {
            set = set.attr("comment", comment);
        }

        let mut cleared = Vec::new();
        for (key, value) in [
            ("protocol", &update.protocol),
            ("src-address", &update.src_address),
            ("dst-port", &update.dst_port),
        ] {
            match value {
                Some(v) => set = set.attr(key, v),
                None => cleared.push(key),
            }
        }

        self.execute(set).await?;
        for key in cleared {
            self.execute(
                Sentence::command("/ip/firewall/filter/unset")
                    .attr("numbers", &update.id)
                    .attr("value-name", key),
            )
            .await?;
        }
        Ok(())
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// PPP and Hotspot sessions. Routers without the hotspot package
    /// answer the hotspot menu with a trap; that yields no rows.
    pub async fn active_sessions(&mut self) -> Result<Vec<ActiveSession>, Error> {
        let ppp = self.execute(Sentence::command("/ppp/active/print")).await?;
        let mut sessions: Vec<ActiveSession> =
            ppp.iter().filter_map(ActiveSession::from_ppp).collect();

        match self.execute(Sentence::command("/ip/hotspot/active/print")).await {
            Ok(rows) => sessions.extend(rows.iter().filter_map(ActiveSession::from_hotspot)),
            Err(Error::Trap { message, .. }) => {
                debug!(peer = self.peer(), %message, "hotspot menu unavailable");
            }
            Err(e) => return Err(e),
        }

        Ok(sessions)
    }

    /// Disconnect a session by its `.id`.
    pub async fn remove_session(&mut self, source: SessionSource, id: &str) -> Result<(), Error> {
        let path = format!("{}/remove", source.menu());
        self.execute(Sentence::command(path).attr(".id", id))
            .await
            .map(drop)
    }

    pub async fn queue_rates(&mut self) -> Result<Vec<QueueRate>, Error> {
        let rows = self.execute(Sentence::command("/queue/simple/print")).await?;
        Ok(rows.iter().filter_map(QueueRate::from_attrs).collect())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn first_row<'a>(rows: &'a [Attributes], menu: &str) -> Result<&'a Attributes, Error> {
    rows.first()
        .ok_or_else(|| Error::Protocol(format!("{menu} print returned no rows")))
}

fn missing(menu: &str, field: &str) -> Error {
    Error::Deserialization {
        message: format!("{menu} row has no '{field}'"),
        body: String::new(),
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(Some("8.8.8.8, ,8.8.4.4")), vec!["8.8.8.8", "8.8.4.4"]);
        assert!(split_list(None).is_empty());
    }
}
