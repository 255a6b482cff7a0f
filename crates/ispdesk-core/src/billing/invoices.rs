use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate};
use tracing::{debug, info};

use super::{next_sequence, sequential_id, today};
use crate::error::CoreError;
use crate::model::{EntityId, Invoice, InvoiceStatus};
use crate::store::DataStore;
use crate::validation::FieldErrors;

/// Issued bills and their payment state.
#[derive(Clone)]
pub struct Invoices {
    store: Arc<DataStore>,
    due_days: u32,
}

impl Invoices {
    pub(crate) fn new(store: Arc<DataStore>, due_days: u32) -> Self {
        Self { store, due_days }
    }

    /// Invoices, newest first, optionally narrowed to one status.
    pub fn list(&self, status: Option<InvoiceStatus>) -> Vec<Arc<Invoice>> {
        self.store
            .invoices_snapshot()
            .iter()
            .filter(|i| status.is_none_or(|s| i.status == s))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &EntityId) -> Result<Arc<Invoice>, CoreError> {
        self.store
            .invoice(id)
            .ok_or_else(|| CoreError::not_found("invoice", id))
    }

    /// Bill a customer. The due date is `issue_date` plus the configured
    /// payment window.
    pub fn create(
        &self,
        customer_id: &EntityId,
        amount: f64,
        issue_date: Option<NaiveDate>,
    ) -> Result<Arc<Invoice>, CoreError> {
        let customer = self
            .store
            .customer(customer_id)
            .ok_or_else(|| CoreError::not_found("customer", customer_id))?;
        if !(amount.is_finite() && amount > 0.0) {
            return Err(FieldErrors::single("amount", "Amount must be positive"));
        }

        let issued = issue_date.unwrap_or_else(today);
        let due = issued
            .checked_add_days(Days::new(u64::from(self.due_days)))
            .ok_or_else(|| FieldErrors::single("issue_date", "Issue date is out of range"))?;
        let prefix = format!("INV-{}-", issued.year());
        let snapshot = self.store.invoices_snapshot();
        let id = sequential_id(&prefix, next_sequence(snapshot.iter().map(|i| &i.id), &prefix));

        let invoice = Invoice {
            id: id.clone(),
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
            amount,
            issue_date: issued,
            due_date: due,
            status: InvoiceStatus::Due,
        };
        info!(id = %id, customer = %customer.name, amount, "invoice created");

        self.store.invoices.push_front(id.clone(), invoice);
        self.store.mark_dirty();
        self.get(&id)
    }

    /// Record payment. Paying a paid invoice is a no-op.
    pub fn mark_paid(&self, id: &EntityId) -> Result<Arc<Invoice>, CoreError> {
        let current = self.get(id)?;
        if current.status == InvoiceStatus::Paid {
            debug!(id = %id, "invoice already paid");
            return Ok(current);
        }
        let mut paid = (*current).clone();
        paid.status = InvoiceStatus::Paid;
        if !self.store.invoices.replace(id, paid) {
            return Err(CoreError::not_found("invoice", id));
        }
        self.store.mark_dirty();
        info!(id = %id, "invoice paid");
        self.get(id)
    }

    /// Move every due invoice past its due date to overdue. Returns how
    /// many changed.
    pub fn refresh_overdue(&self, today: NaiveDate) -> usize {
        let late: Vec<_> = self
            .store
            .invoices_snapshot()
            .iter()
            .filter(|i| i.is_past_due(today))
            .cloned()
            .collect();

        for invoice in &late {
            let mut overdue = (**invoice).clone();
            overdue.status = InvoiceStatus::Overdue;
            self.store.invoices.replace(&invoice.id, overdue);
        }
        if !late.is_empty() {
            self.store.mark_dirty();
            info!(count = late.len(), "invoices marked overdue");
        }
        late.len()
    }
}
