//! Server inventory and connection test handlers.

use std::sync::Arc;

use secrecy::SecretString;
use tabled::Tabled;

use ispdesk_core::{
    DeviceDraft, DeviceRecord, DeviceStatus, EntityId, ProbeOutcome, RouterOsVersion, Session,
};

use crate::cli::{GlobalOpts, RosVersion, ServerStatus, ServersArgs, ServersCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Checked")]
    last_checked: String,
}

fn row(d: &Arc<DeviceRecord>, global: &GlobalOpts) -> ServerRow {
    ServerRow {
        id: d.id.to_string(),
        name: d.name.clone(),
        host: d.host.clone(),
        port: d.api_port,
        version: d.protocol_version.to_string(),
        status: output::paint_status(&d.status.to_string(), global),
        last_checked: d.last_checked_at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn detail(d: &Arc<DeviceRecord>) -> String {
    [
        format!("ID:           {}", d.id),
        format!("Name:         {}", d.name),
        format!("Host:         {}", d.host),
        format!("API Port:     {}", d.api_port),
        format!("Username:     {}", d.username),
        format!("Version:      {}", d.protocol_version),
        format!("Timeout:      {}s", d.timeout_seconds),
        format!("Status:       {}", d.status),
        format!("Last Checked: {}", d.last_checked_at.to_rfc3339()),
    ]
    .join("\n")
}

fn probe_detail(o: &ProbeOutcome, global: &GlobalOpts) -> String {
    let mut lines = vec![
        format!("Server:   {} ({})", o.device_name, o.device_id),
        format!("Result:   {}", output::paint_status(&o.state.to_string(), global)),
    ];
    if let Some(latency) = o.latency {
        lines.push(format!("Latency:  {} ms", latency.as_millis()));
    }
    if !o.detail.is_empty() {
        lines.push(format!("Detail:   {}", o.detail));
    }
    lines.join("\n")
}

// ── Arg conversion ──────────────────────────────────────────────────

fn version_of(v: RosVersion) -> RouterOsVersion {
    match v {
        RosVersion::V6 => RouterOsVersion::V6,
        RosVersion::V7 => RouterOsVersion::V7,
    }
}

fn status_of(s: ServerStatus) -> DeviceStatus {
    match s {
        ServerStatus::Active => DeviceStatus::Active,
        ServerStatus::Disabled => DeviceStatus::Disabled,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    session: &Session,
    args: ServersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let registry = session.registry()?;

    match args.command {
        ServersCommand::List => {
            let snap = registry.list();
            let out = output::render_list(
                global.format(),
                &snap,
                |d| row(d, global),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Get { server } => {
            let device = registry.get(&EntityId::from(server))?;
            let out = output::render_single(global.format(), &device, detail, |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Add {
            name,
            host,
            port,
            username,
            password,
            version,
            timeout,
            status,
        } => {
            let password = match password {
                Some(p) => p,
                None => util::prompt_secret("API password: ", "password")?,
            };
            let added = registry.add(DeviceDraft {
                name,
                host,
                api_port: port,
                username,
                password: SecretString::from(password),
                protocol_version: version_of(version),
                timeout_seconds: timeout,
                status: status_of(status),
            })?;
            output::notice(&format!("Server '{}' added ({})", added.name, added.id), global);
            let out = output::render_single(global.format(), &added, detail, |d| d.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServersCommand::Edit {
            server,
            name,
            host,
            port,
            username,
            password,
            version,
            timeout,
            status,
        } => {
            let id = EntityId::from(server);
            let existing = registry.get(&id)?;
            let base = DeviceDraft::from_record(&existing);
            let draft = DeviceDraft {
                name: name.unwrap_or(base.name),
                host: host.unwrap_or(base.host),
                api_port: port.unwrap_or(base.api_port),
                username: username.unwrap_or(base.username),
                password: password.map_or(base.password, SecretString::from),
                protocol_version: version.map_or(base.protocol_version, version_of),
                timeout_seconds: timeout.unwrap_or(base.timeout_seconds),
                status: status.map_or(base.status, status_of),
            };
            let updated = registry.update(&id, draft)?;
            output::notice(&format!("Server '{}' updated", updated.name), global);
            Ok(())
        }

        ServersCommand::Remove { server } => {
            let request = registry.request_removal(&EntityId::from(server))?;
            if !util::confirm(&request.prompt(), "servers remove", global)? {
                output::notice("Cancelled", global);
                return Ok(());
            }
            let removed = registry.confirm_removal(request)?;
            output::notice(&format!("Server '{}' removed", removed.name), global);
            Ok(())
        }

        ServersCommand::Test { server } => {
            let id = EntityId::from(server);
            let name = registry.get(&id)?.name.clone();
            let spinner = util::spinner(&format!("Testing connection to {name}..."), global);
            let result = session.tester()?.test_connection(&id).await;
            spinner.finish_and_clear();

            let outcome = result?;
            let out = output::render_single(
                global.format(),
                &outcome,
                |o| probe_detail(o, global),
                |o| o.state.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
