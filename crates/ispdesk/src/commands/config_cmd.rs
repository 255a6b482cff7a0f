//! Config subcommand handlers.

use std::io::IsTerminal;
use std::path::Path;

use dialoguer::{Confirm, Input, Select};
use serde::Serialize;

use ispdesk_config::{
    ADMIN_PASSWORD_ENTRY, Config, INSIGHTS_KEY_ENTRY, load_config_from, save_config, session_path,
    state_path, store_secret,
};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` with every plaintext secret masked.
fn redacted(cfg: &Config) -> Config {
    let mut shown = cfg.clone();
    let mask = |s: &mut Option<String>| {
        if s.is_some() {
            *s = Some(MASK.into());
        }
    };
    mask(&mut shown.auth.password);
    mask(&mut shown.auth.token_secret);
    mask(&mut shown.insights.api_key);
    shown
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn require_terminal(command: &str) -> Result<(), CliError> {
    if std::io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: "interactive".into(),
            reason: format!("'{command}' needs a terminal"),
        })
    }
}

fn prompt_nonempty_secret(label: &str, field: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(secret)
}

/// Offer keyring or plaintext storage. Returns the value to put in the
/// config file, `None` when it went to the keyring.
fn keyring_or_plaintext(
    secret: String,
    keyring_entry: &str,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        store_secret(keyring_entry, &secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

#[derive(Serialize)]
struct Paths {
    config: String,
    state: String,
    session: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, config_path: &Path, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            require_terminal("config init")?;
            eprintln!("ispdesk configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let mut cfg = Config::default();

            cfg.auth.username = Input::new()
                .with_prompt("Admin username")
                .default("admin".into())
                .interact_text()
                .map_err(prompt_err)?;
            let password = prompt_nonempty_secret("Admin password: ", "password")?;
            cfg.auth.password = keyring_or_plaintext(password, ADMIN_PASSWORD_ENTRY, "admin password")?;

            let modes = &["simulated (demo data, no routers contacted)", "routeros (real routers)"];
            let mode = Select::new()
                .with_prompt("Device backend")
                .items(modes)
                .default(0)
                .interact()
                .map_err(prompt_err)?;
            cfg.backend.mode = if mode == 0 { "simulated" } else { "routeros" }.into();

            let want_insights = Confirm::new()
                .with_prompt("Configure a Gemini API key for dashboard insights?")
                .default(false)
                .interact()
                .map_err(prompt_err)?;
            if want_insights {
                let key = prompt_nonempty_secret("Gemini API key: ", "api_key")?;
                cfg.insights.api_key = keyring_or_plaintext(key, INSIGHTS_KEY_ENTRY, "API key")?;
            }

            cfg.billing.currency = Input::new()
                .with_prompt("Billing currency")
                .default(cfg.billing.currency.clone())
                .interact_text()
                .map_err(prompt_err)?;

            save_config(config_path, &cfg)?;
            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("\n  Next: ispdesk login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&load_config_from(config_path)?);
            let out = output::render_single(
                global.format(),
                &cfg,
                |c| {
                    toml::to_string_pretty(c)
                        .unwrap_or_else(|e| format!("# could not render config: {e}"))
                },
                |_| config_path.display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let cfg = load_config_from(config_path)?;
            let state = global.state.clone().unwrap_or_else(|| state_path(&cfg));
            let paths = Paths {
                config: config_path.display().to_string(),
                session: session_path(&state).display().to_string(),
                state: state.display().to_string(),
            };
            let out = output::render_single(
                global.format(),
                &paths,
                |p| format!("Config:   {}\nState:    {}\nSession:  {}", p.config, p.state, p.session),
                |p| p.config.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Secrets ─────────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            require_terminal("config set-password")?;
            let secret = prompt_nonempty_secret("Admin password: ", "password")?;
            store_secret(ADMIN_PASSWORD_ENTRY, &secret)?;
            output::notice("✓ Admin password stored in system keyring", global);
            Ok(())
        }

        ConfigCommand::SetInsightsKey => {
            require_terminal("config set-insights-key")?;
            let secret = prompt_nonempty_secret("Gemini API key: ", "api_key")?;
            store_secret(INSIGHTS_KEY_ENTRY, &secret)?;
            output::notice("✓ Gemini API key stored in system keyring", global);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_masks_every_secret() {
        let mut cfg = Config::default();
        cfg.auth.password = Some("hunter2".into());
        cfg.insights.api_key = Some("AIza-secret".into());
        let shown = redacted(&cfg);
        assert_eq!(shown.auth.password.as_deref(), Some(MASK));
        assert_eq!(shown.insights.api_key.as_deref(), Some(MASK));
        assert_eq!(shown.auth.token_secret, None);
    }
}
