//! Catalog backend abstraction.
//!
//! A `Catalog` answers existence questions and performs single creating
//! actions. It holds no policy: ordering, scope checks and race tolerance
//! live in [`crate::ops`]. Implementations borrow one session for the length
//! of a run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::ident::{Ident, QualifiedName};
use crate::plan::{ColumnSpec, TableSpec};

/// Kind of relation bound to a qualified name (`pg_class.relkind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Table,
    PartitionedTable,
    View,
    MaterializedView,
    Sequence,
    Index,
    ForeignTable,
    CompositeType,
}

impl RelationKind {
    pub fn from_relkind(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Self::Table),
            "p" => Some(Self::PartitionedTable),
            "v" => Some(Self::View),
            "m" => Some(Self::MaterializedView),
            "S" => Some(Self::Sequence),
            "i" | "I" => Some(Self::Index),
            "f" => Some(Self::ForeignTable),
            "c" => Some(Self::CompositeType),
            _ => None,
        }
    }

    /// Columns can be added to it.
    pub fn is_table(self) -> bool {
        matches!(self, Self::Table | Self::PartitionedTable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::PartitionedTable => "partitioned table",
            Self::View => "view",
            Self::MaterializedView => "materialized view",
            Self::Sequence => "sequence",
            Self::Index => "index",
            Self::ForeignTable => "foreign table",
            Self::CompositeType => "composite type",
        }
    }
}

/// A column as the catalog reports it. `data_type` is canonical
/// (see [`crate::canonical_type`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: Ident,
    pub data_type: String,
    pub nullable: bool,
}

#[async_trait]
pub trait Catalog: Send {
    /// Serialize against other convergence runs for the rest of the session's
    /// transaction. Backends without shared state need not do anything.
    async fn acquire_lock(&mut self) -> Result<(), CatalogError> {
        Ok(())
    }

    async fn has_extension(&mut self, name: &Ident) -> Result<bool, CatalogError>;

    /// Must report `AlreadyExists` rather than succeed twice.
    async fn create_extension(&mut self, name: &Ident) -> Result<(), CatalogError>;

    async fn has_schema(&mut self, name: &Ident) -> Result<bool, CatalogError>;

    async fn create_schema(&mut self, name: &Ident) -> Result<(), CatalogError>;

    async fn relation_kind(&mut self, name: &QualifiedName) -> Result<Option<RelationKind>, CatalogError>;

    async fn create_table(&mut self, table: &TableSpec) -> Result<(), CatalogError>;

    /// Columns in attribute order. `DependencyMissing` if the relation is absent.
    async fn columns(&mut self, table: &QualifiedName) -> Result<Vec<ColumnInfo>, CatalogError>;

    async fn add_column(&mut self, table: &QualifiedName, column: &ColumnSpec) -> Result<(), CatalogError>;
}
