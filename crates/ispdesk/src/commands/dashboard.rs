//! Dashboard handler.

use serde::Serialize;

use ispdesk_core::{DashboardStats, Session, format_amount};

use crate::cli::{DashboardArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    currency: String,
    #[serde(flatten)]
    stats: DashboardStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    insights: Option<String>,
}

fn detail(v: &DashboardView) -> String {
    let c = &v.currency;
    let s = &v.stats;
    let mut lines = vec![
        format!("Total Revenue:         {c} {}", format_amount(s.total_revenue)),
        format!("New Customers (30d):   {}", s.new_customers),
        format!("Churned Customers:     {}", s.churned_customers),
        format!("Active Subscriptions:  {}", s.active_subscriptions),
        format!("ARPU:                  {c} {}", format_amount(s.arpu)),
        format!("Top Package:           {}", s.top_package.as_deref().unwrap_or("-")),
        format!("Open Tickets:          {}", s.open_tickets),
    ];
    if let Some(ref insights) = v.insights {
        lines.push(String::new());
        lines.push(insights.clone());
    }
    lines.join("\n")
}

pub async fn handle(
    session: &Session,
    args: DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let dashboard = session.dashboard()?;
    let stats = dashboard.stats();

    let insights = if args.no_insights {
        None
    } else {
        let spinner = util::spinner("Generating insights...", global);
        let text = dashboard.insights(&stats).await;
        spinner.finish_and_clear();
        Some(text)
    };

    let view = DashboardView {
        currency: dashboard.currency().to_owned(),
        stats,
        insights,
    };
    let out = output::render_single(global.format(), &view, detail, |v| {
        format_amount(v.stats.total_revenue)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
