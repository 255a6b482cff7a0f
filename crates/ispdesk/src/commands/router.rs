//! Router configuration handlers.

use tabled::Tabled;

use ispdesk_core::{
    DeviceConfig, DnsEdit, EditSession, EntityId, FirewallAction, FirewallProtocol, FirewallRule,
    NtpEdit, RuleEdit, Session,
};

use crate::cli::{GlobalOpts, RouterArgs, RouterCommand, RouterEditArgs, Toggle};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Rendering ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Dst Port")]
    port: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
}

impl From<&FirewallRule> for RuleRow {
    fn from(r: &FirewallRule) -> Self {
        Self {
            id: r.id.to_string(),
            name: r.name.clone(),
            action: r.action.to_string(),
            protocol: r.protocol.to_string(),
            source: util::or_dash(r.source_address.as_deref()),
            port: util::or_dash(r.destination_port.as_deref()),
            enabled: if r.enabled { "yes" } else { "no" }.into(),
        }
    }
}

fn detail(c: &DeviceConfig) -> String {
    let ntp = if c.ntp.enabled { "enabled" } else { "disabled" };
    let mut out = [
        format!("Identity:       {}", c.identity),
        format!("Date / Time:    {} {}", c.system_date, c.system_time.format("%H:%M:%S")),
        format!("NTP Client:     {ntp}"),
        format!("  Primary:      {}", util::or_dash(Some(c.ntp.primary_server.as_str()))),
        format!("  Secondary:    {}", util::or_dash(Some(c.ntp.secondary_server.as_str()))),
        format!("DNS Primary:    {}", util::or_dash(Some(c.dns.primary_server.as_str()))),
        format!("DNS Secondary:  {}", util::or_dash(Some(c.dns.secondary_server.as_str()))),
    ]
    .join("\n");
    out.push_str("\n\nFirewall filter rules:\n");
    if c.firewall_rules.is_empty() {
        out.push_str("  (none)");
    } else {
        let rows: Vec<RuleRow> = c.firewall_rules.iter().map(RuleRow::from).collect();
        out.push_str(&output::render_table(&rows));
    }
    out
}

fn print_config(config: &DeviceConfig, global: &GlobalOpts) {
    let out = output::render_single(global.format(), config, detail, |c| c.identity.clone());
    output::print_output(&out, global.quiet);
}

// ── Edits ───────────────────────────────────────────────────────────

fn parse_enum<T: std::str::FromStr>(raw: &str, flag: &str, expected: &str) -> Result<T, CliError> {
    raw.trim().parse().map_err(|_| CliError::Validation {
        field: flag.into(),
        reason: format!("expected {expected}, got '{raw}'"),
    })
}

fn optional(value: &str) -> Option<String> {
    Some(value.to_owned()).filter(|v| !v.trim().is_empty())
}

/// Apply every flag to the draft, in form order. The first refused
/// edit aborts the whole command with nothing sent.
fn stage_edits(edit: &mut EditSession, args: RouterEditArgs) -> Result<(), CliError> {
    if let Some(identity) = args.identity {
        edit.set_identity(identity)?;
    }
    if let Some(raw) = args.date {
        edit.set_system_date(util::parse_date(&raw, "date")?)?;
    }
    if let Some(raw) = args.time {
        edit.set_system_time(util::parse_time(&raw, "time")?)?;
    }
    if let Some(toggle) = args.ntp {
        edit.set_ntp(NtpEdit::Enabled(toggle == Toggle::On))?;
    }
    if let Some(server) = args.ntp_primary {
        edit.set_ntp(NtpEdit::PrimaryServer(server))?;
    }
    if let Some(server) = args.ntp_secondary {
        edit.set_ntp(NtpEdit::SecondaryServer(server))?;
    }
    if let Some(server) = args.dns_primary {
        edit.set_dns(DnsEdit::PrimaryServer(server))?;
    }
    if let Some(server) = args.dns_secondary {
        edit.set_dns(DnsEdit::SecondaryServer(server))?;
    }

    for rule in &args.enable_rule {
        edit.toggle_firewall_rule(&EntityId::from(rule.as_str()), true)?;
    }
    for rule in &args.disable_rule {
        edit.toggle_firewall_rule(&EntityId::from(rule.as_str()), false)?;
    }
    for raw in &args.rule_action {
        let (rule, value) = util::split_pair(raw, "rule-action")?;
        let action: FirewallAction = parse_enum(value, "rule-action", "accept, drop or reject")?;
        edit.set_firewall_rule_field(&EntityId::from(rule), RuleEdit::Action(action))?;
    }
    for raw in &args.rule_protocol {
        let (rule, value) = util::split_pair(raw, "rule-protocol")?;
        let protocol: FirewallProtocol =
            parse_enum(value, "rule-protocol", "tcp, udp, icmp or any")?;
        edit.set_firewall_rule_field(&EntityId::from(rule), RuleEdit::Protocol(protocol))?;
    }
    for raw in &args.rule_src {
        let (rule, value) = util::split_pair(raw, "rule-src")?;
        edit.set_firewall_rule_field(&EntityId::from(rule), RuleEdit::SourceAddress(optional(value)))?;
    }
    for raw in &args.rule_port {
        let (rule, value) = util::split_pair(raw, "rule-port")?;
        edit.set_firewall_rule_field(
            &EntityId::from(rule),
            RuleEdit::DestinationPort(optional(value)),
        )?;
    }
    for raw in &args.rule_name {
        let (rule, value) = util::split_pair(raw, "rule-name")?;
        edit.set_firewall_rule_field(&EntityId::from(rule), RuleEdit::Name(value.trim().to_owned()))?;
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: RouterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let editor = session.editor()?;

    match args.command {
        RouterCommand::Show { server, cached } => {
            let id = EntityId::from(server);
            let device = session.registry()?.get(&id)?;
            if cached {
                let config = editor
                    .cached(&id)
                    .ok_or_else(|| CliError::NotFound {
                        resource_type: "cached config".into(),
                        identifier: device.name.clone(),
                        list_command: format!("router show {id}"),
                    })?;
                print_config(&config, global);
                return Ok(());
            }

            let spinner = util::spinner(&format!("Loading configuration from {}...", device.name), global);
            let loaded = editor.load(&id).await;
            spinner.finish_and_clear();
            print_config(loaded?.draft(), global);
            Ok(())
        }

        RouterCommand::Edit(edit_args) => {
            let id = EntityId::from(edit_args.server.as_str());
            let device = session.registry()?.get(&id)?;

            let spinner = util::spinner(&format!("Loading configuration from {}...", device.name), global);
            let loaded = editor.load(&id).await;
            spinner.finish_and_clear();
            let mut edit = loaded?;

            stage_edits(&mut edit, edit_args)?;
            if !edit.is_dirty() {
                output::notice("No changes to apply", global);
                return Ok(());
            }

            let request = editor.request_apply(&edit);
            let sections: Vec<String> = request.changes().iter().map(ToString::to_string).collect();
            output::notice(&format!("Changed: {}", sections.join(", ")), global);
            if !util::confirm(&request.warning(), "router edit", global)? {
                edit.discard();
                output::notice("Changes discarded", global);
                return Ok(());
            }

            let spinner = util::spinner(&format!("Applying changes to {}...", device.name), global);
            let applied = editor.apply(request, &mut edit).await;
            spinner.finish_and_clear();
            let applied = applied?;

            output::notice(&format!("Configuration applied to '{}'", device.name), global);
            print_config(&applied, global);
            Ok(())
        }
    }
}
