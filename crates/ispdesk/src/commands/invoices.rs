//! Invoice handlers.

use std::sync::Arc;

use tabled::Tabled;

use ispdesk_core::{EntityId, Invoice, InvoiceStatus, Session, format_amount};

use crate::cli::{GlobalOpts, InvoiceStatusFilter, InvoicesArgs, InvoicesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct InvoiceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Issued")]
    issued: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn detail(i: &Arc<Invoice>, currency: &str) -> String {
    [
        format!("ID:        {}", i.id),
        format!("Customer:  {} ({})", i.customer_name, i.customer_id),
        format!("Amount:    {currency} {}", format_amount(i.amount)),
        format!("Issued:    {}", i.issue_date),
        format!("Due:       {}", i.due_date),
        format!("Status:    {}", i.status),
    ]
    .join("\n")
}

fn status_of(filter: InvoiceStatusFilter) -> InvoiceStatus {
    match filter {
        InvoiceStatusFilter::Paid => InvoiceStatus::Paid,
        InvoiceStatusFilter::Due => InvoiceStatus::Due,
        InvoiceStatusFilter::Overdue => InvoiceStatus::Overdue,
    }
}

pub fn handle(session: &Session, args: InvoicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let invoices = session.invoices()?;
    let currency = session.dashboard()?.currency().to_owned();

    match args.command {
        InvoicesCommand::List { status } => {
            let list = invoices.list(status.map(status_of));
            let out = output::render_list(
                global.format(),
                &list,
                |i| InvoiceRow {
                    id: i.id.to_string(),
                    customer: i.customer_name.clone(),
                    amount: format!("{currency} {}", format_amount(i.amount)),
                    issued: i.issue_date.to_string(),
                    due: i.due_date.to_string(),
                    status: output::paint_status(&i.status.to_string(), global),
                },
                |i| i.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InvoicesCommand::Create {
            customer,
            amount,
            issue_date,
        } => {
            let issued = issue_date
                .as_deref()
                .map(|raw| util::parse_date(raw, "issue-date"))
                .transpose()?;
            let invoice = invoices.create(&EntityId::from(customer), amount, issued)?;
            output::notice(&format!("Invoice {} issued", invoice.id), global);
            let out = output::render_single(
                global.format(),
                &invoice,
                |i| detail(i, &currency),
                |i| i.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InvoicesCommand::Pay { invoice } => {
            let paid = invoices.mark_paid(&EntityId::from(invoice))?;
            output::notice(&format!("Invoice {} marked paid", paid.id), global);
            Ok(())
        }
    }
}
