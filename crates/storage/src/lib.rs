//! Catalog backends for mitch
//!
//! `MemoryCatalog` models a PostgreSQL catalog in process (tests, dry runs).
//! `PgCatalog` drives a live PostgreSQL session through sqlx.

mod memory;
#[cfg(feature = "postgres")]
mod pg_catalog;
#[cfg(test)]
mod tests;

pub use memory::{CatalogSnapshot, MemoryCatalog, RelationSnapshot};
#[cfg(feature = "postgres")]
pub use pg_catalog::{PgCatalog, connect};
