// ── Storage layer ──

pub(crate) mod collection;
mod data_store;
pub mod repository;
pub mod seed;

pub use data_store::DataStore;
pub use repository::{Repository, StateDocument};
