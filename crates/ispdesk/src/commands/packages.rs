//! Package handlers.

use std::sync::Arc;

use tabled::Tabled;

use ispdesk_core::{Package, PackageDraft, Session, format_amount};

use crate::cli::{GlobalOpts, PackagesArgs, PackagesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Data")]
    data_limit: String,
    #[tabled(rename = "Active")]
    active: u32,
}

pub fn handle(session: &Session, args: PackagesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let packages = session.packages()?;
    let currency = session.dashboard()?.currency().to_owned();

    match args.command {
        PackagesCommand::List => {
            let snap = packages.list();
            let out = output::render_list(
                global.format(),
                &snap,
                |p: &Arc<Package>| PackageRow {
                    id: p.id.to_string(),
                    name: p.name.clone(),
                    speed: p.speed.clone(),
                    price: format!("{currency} {}", format_amount(p.price)),
                    data_limit: p.data_limit.clone(),
                    active: p.active_customers,
                },
                |p| p.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PackagesCommand::Add {
            name,
            speed,
            price,
            data_limit,
        } => {
            let added = packages.add(PackageDraft {
                name,
                speed,
                price,
                data_limit,
            })?;
            output::notice(
                &format!(
                    "Package '{}' added ({}, {currency} {})",
                    added.name,
                    added.id,
                    format_amount(added.price)
                ),
                global,
            );
            Ok(())
        }
    }
}
