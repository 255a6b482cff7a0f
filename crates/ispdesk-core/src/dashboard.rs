// ── Dashboard ──
//
// Business figures aggregated from the store, plus an optional
// natural-language summary from the insight generator. Insights never
// fail the dashboard: any problem degrades to placeholder text.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use ispdesk_api::{GeminiClient, TransportConfig};
use tracing::{debug, warn};

use crate::config::{BillingSettings, InsightSettings};
use crate::error::CoreError;
use crate::model::{CustomerStatus, DashboardStats, InvoiceStatus};
use crate::store::DataStore;

/// Window for counting a customer as new.
const NEW_CUSTOMER_DAYS: u64 = 30;

const UNAVAILABLE_FEATURES: &str = "To enable AI-powered insights, please configure your Gemini \
API key. This feature provides automated analysis of your ISP's performance, including:\n\n\
- Revenue and churn analysis.\n\
- Package performance review.\n\
- Actionable recommendations.";

/// Source of dashboard insights.
pub enum InsightProvider {
    Gemini(GeminiClient),
    Disabled,
}

impl InsightProvider {
    /// Build from settings. No key, or insights switched off, gives
    /// [`InsightProvider::Disabled`].
    pub fn from_settings(settings: &InsightSettings) -> Result<Self, CoreError> {
        let Some(key) = settings.api_key.as_ref().filter(|_| settings.enabled) else {
            return Ok(Self::Disabled);
        };
        let transport = TransportConfig::default().with_timeout(settings.timeout);
        let client = GeminiClient::new(
            key,
            settings.model.clone(),
            settings.endpoint.as_deref(),
            &transport,
        )?;
        Ok(Self::Gemini(client))
    }
}

pub struct Dashboard {
    store: Arc<DataStore>,
    insights: InsightProvider,
    billing: BillingSettings,
    insight_timeout: std::time::Duration,
}

impl Dashboard {
    pub(crate) fn new(
        store: Arc<DataStore>,
        insights: InsightProvider,
        billing: BillingSettings,
        insight_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            insights,
            billing,
            insight_timeout,
        }
    }

    pub fn currency(&self) -> &str {
        &self.billing.currency
    }

    pub fn stats(&self) -> DashboardStats {
        self.stats_on(Utc::now().date_naive())
    }

    pub fn stats_on(&self, today: NaiveDate) -> DashboardStats {
        let since = today
            .checked_sub_days(Days::new(NEW_CUSTOMER_DAYS))
            .unwrap_or(NaiveDate::MIN);

        let customers = self.store.customers_snapshot();
        let new_customers = customers.iter().filter(|c| c.join_date > since).count();
        let churned_customers = customers
            .iter()
            .filter(|c| c.status == CustomerStatus::Inactive)
            .count();

        let total_revenue: f64 = self
            .store
            .invoices_snapshot()
            .iter()
            .filter(|i| i.status == InvoiceStatus::Paid)
            .map(|i| i.amount)
            .sum();

        let packages = self.store.packages_snapshot();
        let active_subscriptions: u32 = packages.iter().map(|p| p.active_customers).sum();
        let top_package = packages
            .iter()
            .filter(|p| p.active_customers > 0)
            .max_by_key(|p| p.active_customers)
            .map(|p| p.name.clone());
        let arpu = if active_subscriptions == 0 {
            0.0
        } else {
            total_revenue / f64::from(active_subscriptions)
        };

        DashboardStats {
            total_revenue,
            new_customers,
            churned_customers,
            active_subscriptions,
            arpu,
            top_package,
            open_tickets: self.store.open_tickets(),
        }
    }

    /// Markdown summary of `stats`. Always returns text.
    pub async fn insights(&self, stats: &DashboardStats) -> String {
        let client = match &self.insights {
            InsightProvider::Gemini(client) => client,
            InsightProvider::Disabled => return unavailable("API Key Not Configured"),
        };
        let prompt = self.prompt(stats);
        debug!(model = client.model(), "requesting insights");

        match tokio::time::timeout(self.insight_timeout, client.generate(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "insight generation failed");
                unavailable(&format!("Failed to generate AI insights: {e}"))
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.insight_timeout.as_secs(),
                    "insight generation timed out"
                );
                unavailable("Failed to generate AI insights: the request timed out")
            }
        }
    }

    fn prompt(&self, stats: &DashboardStats) -> String {
        let currency = &self.billing.currency;
        format!(
            "As an expert business analyst for an Internet Service Provider, analyze the \
             following monthly data and provide a concise summary of key trends, potential \
             issues, and actionable recommendations.\n\n\
             Data:\n\
             - Total Revenue: {currency} {revenue}\n\
             - New Customers: {new}\n\
             - Churned Customers: {churned}\n\
             - Active Subscriptions: {active}\n\
             - Average Revenue Per User (ARPU): {currency} {arpu:.2}\n\
             - Top Selling Package: '{top}'\n\
             - Open Support Tickets: {tickets}\n\n\
             Focus on revenue growth, customer churn, and package performance. Use Markdown \
             for formatting with headings, bold text, and bullet points. Keep the summary \
             under 250 words.",
            revenue = format_amount(stats.total_revenue),
            new = stats.new_customers,
            churned = stats.churned_customers,
            active = stats.active_subscriptions,
            arpu = stats.arpu,
            top = stats.top_package.as_deref().unwrap_or("none"),
            tickets = stats.open_tickets,
        )
    }
}

fn unavailable(reason: &str) -> String {
    format!("**AI Insights Unavailable**\n\n*{reason}*\n\n{UNAVAILABLE_FEATURES}")
}

/// `1234567.5` -> `1,234,567.50`; whole amounts drop the decimals.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    if frac == "00" {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}
