//! Command dispatch: bridges CLI args -> session services -> output formatting.

pub mod auth;
pub mod clients;
pub mod config_cmd;
pub mod customers;
pub mod dashboard;
pub mod invoices;
pub mod packages;
pub mod router;
pub mod servers;
pub mod util;

use ispdesk_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs an authorized session.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Whoami => auth::whoami(session, global),
        Command::Servers(args) => servers::handle(session, args, global).await,
        Command::Router(args) => router::handle(session, args, global).await,
        Command::Clients(args) => clients::handle(session, args, global).await,
        Command::Customers(args) => customers::handle(session, args, global),
        Command::Packages(args) => packages::handle(session, args, global),
        Command::Invoices(args) => invoices::handle(session, args, global),
        Command::Dashboard(args) => dashboard::handle(session, args, global).await,
        Command::Login(_) | Command::Logout | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Internal("command handled before dispatch".into()))
        }
    }
}
