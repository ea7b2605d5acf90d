//! Idempotent schema operations.
//!
//! Every operation checks presence first and creates only on absence. A create
//! that reports `AlreadyExists` means another session won the race between our
//! check and our create; that is folded into `Outcome::AlreadyPresent`.
//! Existing objects are never altered: disagreement with the declaration is
//! reported as `Outcome::Drifted` and left alone.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ColumnInfo};
use crate::error::CatalogError;
use crate::ident::{Ident, QualifiedName};
use crate::plan::{ColumnSpec, ObjectKind, SchemaOp, TableSpec};
use crate::types::canonical_type;

/// What an operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyPresent,
    /// Present, but differs from the declaration. Nothing was changed.
    Drifted { details: Vec<String> },
}

impl Outcome {
    /// Whether the catalog structure changed.
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyPresent => "already_present",
            Self::Drifted { .. } => "drifted",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drifted { details } => write!(f, "drifted ({})", details.join("; ")),
            other => f.write_str(other.as_str()),
        }
    }
}

fn settle<T: fmt::Display + ?Sized>(
    result: Result<(), CatalogError>,
    kind: ObjectKind,
    target: &T,
) -> Result<Outcome, CatalogError> {
    match result {
        Ok(()) => Ok(Outcome::Created),
        Err(CatalogError::AlreadyExists(detail)) => {
            tracing::debug!(%kind, %target, %detail, "created concurrently by another session");
            Ok(Outcome::AlreadyPresent)
        },
        Err(err) => Err(err),
    }
}

fn drift_outcome(details: Vec<String>) -> Outcome {
    if details.is_empty() { Outcome::AlreadyPresent } else { Outcome::Drifted { details } }
}

fn column_drift(declared: &ColumnSpec, expect_nullable: bool, found: &ColumnInfo) -> Vec<String> {
    let mut details = Vec::new();
    let declared_type = canonical_type(&declared.data_type);
    let found_type = canonical_type(&found.data_type);
    if declared_type != found_type {
        details.push(format!("column {}: declared {declared_type}, found {found_type}", declared.name));
    }
    if expect_nullable != found.nullable {
        let describe = |nullable: bool| if nullable { "nullable" } else { "not null" };
        details.push(format!(
            "column {}: declared {}, found {}",
            declared.name,
            describe(expect_nullable),
            describe(found.nullable)
        ));
    }
    details
}

/// Resolve the relation behind `table`, insisting it is something columns live in.
async fn require_table<C: Catalog + ?Sized>(catalog: &mut C, table: &QualifiedName) -> Result<(), CatalogError> {
    match catalog.relation_kind(table).await? {
        Some(kind) if kind.is_table() => Ok(()),
        Some(kind) => Err(CatalogError::NameConflict(format!("{table} is a {}, not a table", kind.as_str()))),
        None => Err(CatalogError::DependencyMissing(format!("table {table} does not exist"))),
    }
}

pub async fn ensure_extension<C: Catalog + ?Sized>(catalog: &mut C, name: &Ident) -> Result<Outcome, CatalogError> {
    if catalog.has_extension(name).await? {
        return Ok(Outcome::AlreadyPresent);
    }
    settle(catalog.create_extension(name).await, ObjectKind::Extension, name)
}

pub async fn ensure_schema<C: Catalog + ?Sized>(catalog: &mut C, name: &Ident) -> Result<Outcome, CatalogError> {
    if catalog.has_schema(name).await? {
        return Ok(Outcome::AlreadyPresent);
    }
    settle(catalog.create_schema(name).await, ObjectKind::Schema, name)
}

/// Guarantees presence only. An existing table keeps its columns as they are;
/// declared columns it lacks or that disagree are reported as drift.
pub async fn ensure_table<C: Catalog + ?Sized>(catalog: &mut C, spec: &TableSpec) -> Result<Outcome, CatalogError> {
    if !catalog.has_schema(&spec.name.schema).await? {
        return Err(CatalogError::DependencyMissing(format!("schema {} does not exist", spec.name.schema)));
    }

    match catalog.relation_kind(&spec.name).await? {
        None => settle(catalog.create_table(spec).await, ObjectKind::Table, &spec.name),
        Some(kind) if !kind.is_table() => Err(CatalogError::NameConflict(format!(
            "{} is a {}, not a table",
            spec.name,
            kind.as_str()
        ))),
        Some(_) => {
            let existing = catalog.columns(&spec.name).await?;
            let mut details = Vec::new();
            for declared in &spec.columns {
                match existing.iter().find(|c| c.name == declared.name) {
                    Some(found) => {
                        let expect_nullable = declared.nullable && !spec.is_key_column(&declared.name);
                        details.extend(column_drift(declared, expect_nullable, found));
                    },
                    None => details.push(format!("column {}: declared, missing", declared.name)),
                }
            }
            Ok(drift_outcome(details))
        },
    }
}

/// Adds the column when absent. An existing column of that name is left as is,
/// whatever its type.
pub async fn ensure_column<C: Catalog + ?Sized>(
    catalog: &mut C,
    table: &QualifiedName,
    column: &ColumnSpec,
) -> Result<Outcome, CatalogError> {
    require_table(catalog, table).await?;

    let existing = catalog.columns(table).await?;
    if let Some(found) = existing.iter().find(|c| c.name == column.name) {
        return Ok(drift_outcome(column_drift(column, column.nullable, found)));
    }

    let target = format!("{table}.{}", column.name);
    settle(catalog.add_column(table, column).await, ObjectKind::Column, &target)
}

impl SchemaOp {
    /// Converge the catalog to this single intent.
    pub async fn apply<C: Catalog + ?Sized>(&self, catalog: &mut C) -> Result<Outcome, CatalogError> {
        match self {
            Self::Extension { name } => ensure_extension(catalog, name).await,
            Self::Schema { name } => ensure_schema(catalog, name).await,
            Self::Table(spec) => ensure_table(catalog, spec).await,
            Self::Column { table, column } => ensure_column(catalog, table, column).await,
        }
    }
}

