//! Customer handlers, including CSV import and export.

use std::sync::Arc;

use tabled::Tabled;

use ispdesk_core::{Customer, CustomerDraft, CustomerStatus, EntityId, Session};

use crate::cli::{CustomerStatusFilter, CustomersArgs, CustomersCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CustomerRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Joined")]
    joined: String,
}

fn row(c: &Arc<Customer>, global: &GlobalOpts) -> CustomerRow {
    CustomerRow {
        id: c.id.to_string(),
        name: c.name.clone(),
        email: c.email.clone(),
        phone: c.phone.clone(),
        package: c.package.clone(),
        status: output::paint_status(&c.status.to_string(), global),
        online: output::paint_status(&c.online_status.to_string(), global),
        joined: c.join_date.to_string(),
    }
}

fn detail(c: &Arc<Customer>) -> String {
    [
        format!("ID:       {}", c.id),
        format!("Name:     {}", c.name),
        format!("Email:    {}", c.email),
        format!("Phone:    {}", c.phone),
        format!("Address:  {}", c.address),
        format!("Package:  {}", c.package),
        format!("Status:   {} ({})", c.status, c.online_status),
        format!("Joined:   {}", c.join_date),
    ]
    .join("\n")
}

fn status_of(filter: CustomerStatusFilter) -> CustomerStatus {
    match filter {
        CustomerStatusFilter::Active => CustomerStatus::Active,
        CustomerStatusFilter::Suspended => CustomerStatus::Suspended,
        CustomerStatusFilter::Inactive => CustomerStatus::Inactive,
    }
}

fn print_list(customers: &[Arc<Customer>], global: &GlobalOpts) {
    let out = output::render_list(
        global.format(),
        customers,
        |c| row(c, global),
        |c| c.id.to_string(),
    );
    output::print_output(&out, global.quiet);
}

pub fn handle(session: &Session, args: CustomersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let customers = session.customers()?;

    match args.command {
        CustomersCommand::List { status } => {
            let wanted = status.map(status_of);
            let list: Vec<Arc<Customer>> = customers
                .list()
                .iter()
                .filter(|c| wanted.is_none_or(|s| c.status == s))
                .cloned()
                .collect();
            print_list(&list, global);
            Ok(())
        }

        CustomersCommand::Get { customer } => {
            let found = customers.get(&EntityId::from(customer))?;
            let out = output::render_single(global.format(), &found, detail, |c| c.id.to_string());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CustomersCommand::Add {
            name,
            email,
            phone,
            package,
            address,
        } => {
            let added = customers.add(CustomerDraft {
                name,
                email,
                phone,
                package,
                address,
            })?;
            output::notice(&format!("Customer '{}' added ({})", added.name, added.id), global);
            Ok(())
        }

        CustomersCommand::Import { file } => {
            let text = std::fs::read_to_string(&file)?;
            let imported = customers.import_csv(&text)?;
            output::notice(
                &format!("Imported {} customers from {}", imported.len(), file.display()),
                global,
            );
            print_list(&imported, global);
            Ok(())
        }

        CustomersCommand::Export { out } => {
            let csv = customers.export_csv();
            match out {
                Some(path) => {
                    std::fs::write(&path, format!("{csv}\n"))?;
                    output::notice(&format!("Customers exported to {}", path.display()), global);
                }
                None => output::print_output(&csv, global.quiet),
            }
            Ok(())
        }

        CustomersCommand::Suspend { customer } => {
            set_status(session, &customer, CustomerStatus::Suspended, global)
        }
        CustomersCommand::Activate { customer } => {
            set_status(session, &customer, CustomerStatus::Active, global)
        }
        CustomersCommand::Deactivate { customer } => {
            set_status(session, &customer, CustomerStatus::Inactive, global)
        }
    }
}

fn set_status(
    session: &Session,
    customer: &str,
    status: CustomerStatus,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let updated = session
        .customers()?
        .set_status(&EntityId::from(customer), status)?;
    output::notice(&format!("Customer '{}' is now {}", updated.name, updated.status), global);
    Ok(())
}
