// ── Billing services ──
//
// Customers, packages and invoices. All state lives in the shared store;
// these handles add validation and id allocation on top.

mod csv;
mod customers;
mod invoices;
mod packages;

use chrono::{NaiveDate, Utc};

pub use csv::CsvError;
pub use customers::Customers;
pub use invoices::Invoices;
pub use packages::Packages;

use crate::model::EntityId;

/// Header of a customer export, in column order.
pub const EXPORT_COLUMNS: [&str; 8] = [
    "id", "name", "email", "phone", "package", "status", "joinDate", "address",
];

/// Columns an import file must carry, in any order.
pub const IMPORT_COLUMNS: [&str; 5] = ["name", "email", "phone", "package", "address"];

/// Next free number for ids shaped `<prefix><digits>`. Ids that do not
/// fit the shape are ignored.
fn next_sequence<'a>(ids: impl Iterator<Item = &'a EntityId>, prefix: &str) -> u32 {
    ids.filter_map(|id| id.as_legacy()?.strip_prefix(prefix)?.parse::<u32>().ok())
        .max()
        .map_or(1, |n| n + 1)
}

fn sequential_id(prefix: &str, seq: u32) -> EntityId {
    EntityId::from(format!("{prefix}{seq:03}"))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_skips_foreign_shapes() {
        let ids = [
            EntityId::from("CUST001"),
            EntityId::from("CUST-IMP-6"),
            EntityId::from("CUST005"),
            EntityId::generate(),
        ];
        assert_eq!(next_sequence(ids.iter(), "CUST"), 6);
        assert_eq!(sequential_id("CUST", 6).to_string(), "CUST006");
    }

    #[test]
    fn empty_collection_starts_at_one() {
        assert_eq!(next_sequence(std::iter::empty(), "PKG"), 1);
    }
}
