// ── Subscribers, packages and invoices ──

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;
use crate::validation::{FieldErrors, looks_like_email};

use super::EntityId;

// ── Customers ───────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CustomerStatus {
    #[default]
    Active,
    Suspended,
    Inactive,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OnlineStatus {
    Online,
    #[default]
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: CustomerStatus,
    pub online_status: OnlineStatus,
    /// Package name, not id.
    pub package: String,
    pub join_date: NaiveDate,
    pub address: String,
}

/// Add-customer form input. Also produced by each CSV import row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub package: String,
    pub address: String,
}

impl CustomerDraft {
    /// Field checks that need no store access. Package existence is
    /// checked by the service.
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name, "Name is required");
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else {
            errors.check(looks_like_email(&self.email), "email", "Email is invalid");
        }
        errors.require("phone", &self.phone, "Phone is required");
        errors.require("address", &self.address, "Address is required");
        errors.require("package", &self.package, "Package is required");
        errors
    }

    pub(crate) fn into_customer(self, id: EntityId, package: String, today: NaiveDate) -> Customer {
        Customer {
            id,
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
            status: CustomerStatus::Active,
            online_status: OnlineStatus::Offline,
            package,
            join_date: today,
            address: self.address.trim().to_owned(),
        }
    }
}

// ── Packages ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: EntityId,
    pub name: String,
    /// Download/upload, e.g. `100/20 Mbps`.
    pub speed: String,
    pub price: f64,
    pub data_limit: String,
    pub active_customers: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageDraft {
    pub name: String,
    pub speed: String,
    pub price: Option<f64>,
    pub data_limit: String,
}

impl PackageDraft {
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name, "Package name is required");
        errors.require("speed", &self.speed, "Speed is required (e.g., 100/20 Mbps)");
        match self.price {
            None => errors.add("price", "Price is required"),
            Some(p) => errors.check(
                p.is_finite() && p > 0.0,
                "price",
                "Please enter a valid positive price",
            ),
        }
        errors.require("data_limit", &self.data_limit, "Data limit is required");
        errors.into_result()
    }
}

// ── Invoices ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum InvoiceStatus {
    Paid,
    Due,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: EntityId,
    pub customer_id: EntityId,
    pub customer_name: String,
    pub amount: f64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
}

impl Invoice {
    /// A due invoice whose due date has passed.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Due && today > self.due_date
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn customer_draft_reports_bad_email() {
        let draft = CustomerDraft {
            name: "Dana".into(),
            email: "dana@example".into(),
            phone: "555-0199".into(),
            package: "Fiber 50 Mbps".into(),
            address: "1 Road".into(),
        };
        let errors = draft.field_errors();
        assert_eq!(errors.get("email"), Some("Email is invalid"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn package_price_must_be_positive() {
        let draft = PackageDraft {
            name: "Fiber 10".into(),
            speed: "10/2 Mbps".into(),
            price: Some(0.0),
            data_limit: "Unlimited".into(),
        };
        let Err(CoreError::Validation(errors)) = draft.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("price"), Some("Please enter a valid positive price"));
    }

    #[test]
    fn invoice_status_serializes_capitalized() {
        assert_eq!(serde_json::to_string(&InvoiceStatus::Overdue).unwrap(), "\"Overdue\"");
        assert_eq!("due".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Due);
    }

    #[test]
    fn past_due_only_applies_to_due_invoices() {
        let date = |d| NaiveDate::from_ymd_opt(2024, 7, d).unwrap();
        let mut invoice = Invoice {
            id: EntityId::from("INV-2024-002"),
            customer_id: EntityId::from("CUST002"),
            customer_name: "Jane Smith".into(),
            amount: 1800.0,
            issue_date: date(1),
            due_date: date(15),
            status: InvoiceStatus::Due,
        };
        assert!(!invoice.is_past_due(date(15)));
        assert!(invoice.is_past_due(date(16)));
        invoice.status = InvoiceStatus::Paid;
        assert!(!invoice.is_past_due(date(16)));
    }
}
