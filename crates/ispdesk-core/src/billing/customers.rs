use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::{EXPORT_COLUMNS, IMPORT_COLUMNS, csv, next_sequence, sequential_id, today};
use crate::error::CoreError;
use crate::model::{Customer, CustomerDraft, CustomerStatus, EntityId};
use crate::store::DataStore;
use crate::validation::FieldErrors;

const ID_PREFIX: &str = "CUST";

/// Subscriber records.
#[derive(Clone)]
pub struct Customers {
    store: Arc<DataStore>,
}

impl Customers {
    pub(crate) fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }

    /// All customers, newest first.
    pub fn list(&self) -> Arc<Vec<Arc<Customer>>> {
        self.store.customers_snapshot()
    }

    pub fn get(&self, id: &EntityId) -> Result<Arc<Customer>, CoreError> {
        self.store
            .customer(id)
            .ok_or_else(|| CoreError::not_found("customer", id))
    }

    pub fn add(&self, draft: CustomerDraft) -> Result<Arc<Customer>, CoreError> {
        self.add_on(draft, today())
    }

    fn add_on(&self, draft: CustomerDraft, joined: NaiveDate) -> Result<Arc<Customer>, CoreError> {
        let package = self.check(&draft).into_result().map(|()| self.package_name(&draft))?;
        let id = sequential_id(ID_PREFIX, self.next_seq());
        let customer = draft.into_customer(id.clone(), package, joined);
        info!(id = %id, name = %customer.name, "customer added");

        self.store.customers.push_front(id.clone(), customer);
        self.store.mark_dirty();
        self.get(&id)
    }

    /// Import customers from CSV text. Either every row is valid and all
    /// are added, or nothing changes and every bad row is reported.
    pub fn import_csv(&self, text: &str) -> Result<Vec<Arc<Customer>>, CoreError> {
        let rows = csv::parse(text).map_err(|e| FieldErrors::single("file", &e.to_string()))?;
        let mut rows = rows.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| FieldErrors::single("file", "File is empty"))?;
        let columns = column_positions(&header)?;

        let mut errors = FieldErrors::new();
        let mut drafts = Vec::new();
        for (idx, row) in rows.enumerate() {
            let cell = |name: &str| {
                columns
                    .get(name)
                    .and_then(|&pos| row.get(pos))
                    .cloned()
                    .unwrap_or_default()
            };
            let draft = CustomerDraft {
                name: cell("name"),
                email: cell("email"),
                phone: cell("phone"),
                package: cell("package"),
                address: cell("address"),
            };
            errors.extend_prefixed(&format!("row {}: ", idx + 1), self.check(&draft));
            drafts.push(draft);
        }
        if drafts.is_empty() {
            errors.add("file", "No customer rows found");
        }
        if !errors.is_empty() {
            debug!(problems = errors.len(), "customer import rejected");
            return Err(CoreError::Validation(errors));
        }

        let joined = today();
        let first = self.next_seq();
        let mut ids = Vec::with_capacity(drafts.len());
        let mut customers = Vec::with_capacity(drafts.len());
        for (seq, draft) in (first..).zip(drafts) {
            let id = sequential_id(ID_PREFIX, seq);
            let package = self.package_name(&draft);
            ids.push(id.clone());
            customers.push((id.clone(), draft.into_customer(id, package, joined)));
        }
        self.store.customers.push_front_all(customers);
        self.store.mark_dirty();
        info!(count = ids.len(), "customers imported");

        ids.iter().map(|id| self.get(id)).collect()
    }

    /// Every customer as CSV, newest first.
    pub fn export_csv(&self) -> String {
        let mut lines = vec![EXPORT_COLUMNS.join(",")];
        for c in self.list().iter() {
            let fields = [
                c.id.to_string(),
                c.name.clone(),
                c.email.clone(),
                c.phone.clone(),
                c.package.clone(),
                c.status.to_string(),
                c.join_date.format("%Y-%m-%d").to_string(),
                c.address.clone(),
            ];
            let quoted: Vec<String> = fields.iter().map(|f| csv::quote(f)).collect();
            lines.push(quoted.join(","));
        }
        lines.join("\n")
    }

    /// Suspend, reactivate or deactivate a customer.
    pub fn set_status(
        &self,
        id: &EntityId,
        status: CustomerStatus,
    ) -> Result<Arc<Customer>, CoreError> {
        let current = self.get(id)?;
        if current.status == status {
            return Ok(current);
        }
        let mut updated = (*current).clone();
        updated.status = status;
        if !self.store.customers.replace(id, updated) {
            return Err(CoreError::not_found("customer", id));
        }
        self.store.mark_dirty();
        info!(id = %id, %status, "customer status changed");
        self.get(id)
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn check(&self, draft: &CustomerDraft) -> FieldErrors {
        let mut errors = draft.field_errors();
        if !draft.package.trim().is_empty() && self.store.package_by_name(&draft.package).is_none() {
            errors.add("package", "Package does not exist");
        }
        errors
    }

    /// Canonical spelling of the draft's package.
    fn package_name(&self, draft: &CustomerDraft) -> String {
        self.store
            .package_by_name(&draft.package)
            .map_or_else(|| draft.package.trim().to_owned(), |p| p.name.clone())
    }

    fn next_seq(&self) -> u32 {
        let snapshot = self.store.customers_snapshot();
        next_sequence(snapshot.iter().map(|c| &c.id), ID_PREFIX)
    }
}

fn column_positions(header: &[String]) -> Result<HashMap<&'static str, usize>, CoreError> {
    let mut positions = HashMap::new();
    let mut errors = FieldErrors::new();
    for name in IMPORT_COLUMNS {
        match header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
        {
            Some(pos) => {
                positions.insert(name, pos);
            }
            None => errors.add(format!("header: {name}"), "Missing column"),
        }
    }
    errors.into_result().map(|()| positions)
}
