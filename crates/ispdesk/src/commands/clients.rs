//! Online session handlers.

use std::sync::Arc;

use tabled::Tabled;

use ispdesk_core::{EntityId, KickOutcome, OnlineClientSession, Session};

use crate::cli::{ClientsArgs, ClientsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Down")]
    down: String,
    #[tabled(rename = "Up")]
    up: String,
}

impl From<&Arc<OnlineClientSession>> for ClientRow {
    fn from(s: &Arc<OnlineClientSession>) -> Self {
        Self {
            id: s.id.to_string(),
            username: s.username.clone(),
            ip: s.ip_address.clone(),
            mac: s.mac_address.to_string(),
            server: s.server.clone(),
            uptime: s.uptime.clone(),
            down: s.download_speed.clone(),
            up: s.upload_speed.clone(),
        }
    }
}

pub async fn handle(
    session: &Session,
    args: ClientsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let monitor = session.monitor()?;

    match args.command {
        ClientsCommand::List { filter, refresh } => {
            if refresh {
                let spinner = util::spinner("Collecting sessions from active servers...", global);
                let count = monitor.refresh().await;
                spinner.finish_and_clear();
                tracing::info!(count, "sessions refreshed");
            }
            let sessions = monitor.list(&filter);
            let out = output::render_list(
                global.format(),
                &sessions,
                |s| ClientRow::from(s),
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Kick { session: id } => {
            let outcome = monitor.kick(&EntityId::from(id.as_str())).await?;
            let message = match outcome {
                KickOutcome::Disconnected => format!("Session {id} disconnected"),
                KickOutcome::AlreadyGone => format!("Session {id} was already gone"),
            };
            output::notice(&message, global);
            Ok(())
        }
    }
}
