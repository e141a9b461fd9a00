//! Layer catalog for processed tile pyramids.
//!
//! The catalog is a single JSON document (`{ "layers": [...] }`) listing every
//! processed layer and how to address its tiles. It is modelled as a small
//! transaction: load through a [`CatalogStore`], apply a pure transform such
//! as [`Catalog::upsert`], and save the whole document back.
//!
//! No cross-process locking is performed. Concurrent writers against the same
//! file race and the last save wins.

pub mod catalog;
pub mod error;
pub mod store;

pub use catalog::{Catalog, CatalogEntry, CatalogLayer, PartialEntry, RemoveOutcome, UpsertOutcome};
pub use error::{CatalogError, CatalogResult};
pub use store::{CatalogStore, JsonCatalogStore};
