mod cli;
mod commands;
mod error;
mod output;
mod session;

use std::path::Path;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ispdesk_config::Config;
use ispdesk_core::{Console, Repository};

use crate::cli::{Cli, ColorMode, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Fill `--output` / `--color` from `[defaults]` when not given.
fn apply_defaults(global: &mut GlobalOpts, cfg: &Config) {
    if global.output.is_none() {
        global.output = OutputFormat::from_str(&cfg.defaults.output, true).ok();
    }
    if global.color.is_none() {
        global.color = ColorMode::from_str(&cfg.defaults.color, true).ok();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli {
        mut global,
        command,
    } = cli;
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(ispdesk_config::config_path);

    match command {
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "ispdesk", &mut std::io::stdout());
            Ok(())
        }

        // Config commands never open the state file
        Command::Config(args) => commands::config_cmd::handle(args, &config_path, &global),

        cmd => {
            let cfg = ispdesk_config::load_config_from(&config_path)?;
            apply_defaults(&mut global, &cfg);
            let state_path = global
                .state
                .clone()
                .unwrap_or_else(|| ispdesk_config::state_path(&cfg));
            let session_file = ispdesk_config::session_path(&state_path);

            if matches!(cmd, Command::Logout) {
                return commands::auth::logout(&session_file, &global);
            }

            let console = open_console(&cfg, &state_path)?;
            tracing::debug!(command = ?cmd, state = %state_path.display(), "dispatching command");

            let result = match cmd {
                Command::Login(args) => commands::auth::login(&console, args, &session_file, &global),
                cmd => {
                    let token = session::load(&session_file)?;
                    let session = console.authorize(&token.token)?;
                    commands::dispatch(cmd, &session, &global).await
                }
            };

            // Persist whatever changed, even when the command itself failed.
            let saved = console.save();
            result?;
            saved?;
            Ok(())
        }
    }
}

fn open_console(cfg: &Config, state_path: &Path) -> Result<Console, CliError> {
    let console_config = ispdesk_config::to_console_config(cfg, state_path)?;
    let console = Console::open(
        console_config,
        Repository::StateFile(state_path.to_path_buf()),
    )?;
    Ok(console)
}
