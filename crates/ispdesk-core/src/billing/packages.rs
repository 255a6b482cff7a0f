use std::sync::Arc;

use tracing::info;

use super::{next_sequence, sequential_id};
use crate::error::CoreError;
use crate::model::{EntityId, Package, PackageDraft};
use crate::store::DataStore;
use crate::validation::FieldErrors;

const ID_PREFIX: &str = "PKG";

/// Service plans offered to subscribers.
#[derive(Clone)]
pub struct Packages {
    store: Arc<DataStore>,
}

impl Packages {
    pub(crate) fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Arc<Vec<Arc<Package>>> {
        self.store.packages_snapshot()
    }

    pub fn add(&self, draft: PackageDraft) -> Result<Arc<Package>, CoreError> {
        draft.validate()?;
        if self.store.package_by_name(&draft.name).is_some() {
            return Err(FieldErrors::single(
                "name",
                "A package with this name already exists",
            ));
        }

        let snapshot = self.list();
        let id = sequential_id(ID_PREFIX, next_sequence(snapshot.iter().map(|p| &p.id), ID_PREFIX));
        let package = Package {
            id: id.clone(),
            name: draft.name.trim().to_owned(),
            speed: draft.speed.trim().to_owned(),
            price: draft.price.unwrap_or_default(),
            data_limit: draft.data_limit.trim().to_owned(),
            active_customers: 0,
        };
        info!(id = %id, name = %package.name, price = package.price, "package added");

        self.store.packages.push_front(id.clone(), package);
        self.store.mark_dirty();
        self.store
            .packages
            .get(&id)
            .ok_or_else(|| CoreError::not_found("package", &id))
    }

    pub fn get(&self, id: &EntityId) -> Result<Arc<Package>, CoreError> {
        self.store
            .packages
            .get(id)
            .ok_or_else(|| CoreError::not_found("package", id))
    }
}
