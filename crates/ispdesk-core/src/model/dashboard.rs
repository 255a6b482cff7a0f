// ── Dashboard aggregates ──

use serde::Serialize;

/// Headline business figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: f64,
    pub new_customers: usize,
    pub churned_customers: usize,
    pub active_subscriptions: u32,
    pub arpu: f64,
    pub top_package: Option<String>,
    pub open_tickets: u32,
}
