//! Core types and operations for mitch
//!
//! The plan model, its validation and DDL rendering, and the idempotent
//! `ensure_*` operations that converge any [`Catalog`] to a declared structure.

mod catalog;
pub mod constants;
pub mod ddl;
mod env_config;
mod error;
mod ident;
mod ops;
mod plan;
mod types;

#[cfg(test)]
mod tests;

pub use catalog::{Catalog, ColumnInfo, RelationKind};
pub use constants::*;
pub use env_config::env_parse_with_default;
pub use error::{CatalogError, PlanError};
pub use ident::{Ident, QualifiedName};
pub use ops::{Outcome, ensure_column, ensure_extension, ensure_schema, ensure_table};
pub use plan::{ColumnSpec, ObjectKind, Plan, PrimaryKey, SchemaOp, TableSpec};
pub use types::{base_type, canonical_type, is_serial, is_valid_type_name};
