//! Declarative plan model: the ordered list of structural intents.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::ident::{Ident, QualifiedName};
use crate::types::is_valid_type_name;

fn default_nullable() -> bool {
    true
}

/// One column definition. Columns are nullable unless declared otherwise,
/// matching SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: Ident,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    /// Trusted SQL expression, rendered verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ColumnSpec {
    /// Nullable, non-unique column without default.
    pub fn new(name: Ident, data_type: impl Into<String>) -> Self {
        Self { name, data_type: data_type.into(), nullable: true, unique: false, default: None }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if is_valid_type_name(&self.data_type) {
            Ok(())
        } else {
            Err(PlanError::InvalidTypeName(self.data_type.clone()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKey {
    pub columns: Vec<Ident>,
}

impl PrimaryKey {
    pub fn new(columns: Vec<Ident>) -> Self {
        Self { columns }
    }

    pub fn contains(&self, column: &Ident) -> bool {
        self.columns.contains(column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: QualifiedName,
    pub columns: Vec<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,
}

impl TableSpec {
    pub fn new(name: QualifiedName, columns: Vec<ColumnSpec>, primary_key: Option<PrimaryKey>) -> Self {
        Self { name, columns, primary_key }
    }

    pub fn column(&self, name: &Ident) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| &c.name == name)
    }

    pub fn is_key_column(&self, name: &Ident) -> bool {
        self.primary_key.as_ref().is_some_and(|pk| pk.contains(name))
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let table = self.name.to_string();
        if self.columns.is_empty() {
            return Err(PlanError::EmptyTable { table });
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            column.validate()?;
            if !seen.insert(&column.name) {
                return Err(PlanError::DuplicateColumn { table, column: column.name.to_string() });
            }
        }

        if let Some(pk) = &self.primary_key {
            if pk.columns.is_empty() {
                return Err(PlanError::EmptyPrimaryKey { table });
            }
            let mut key_seen = HashSet::new();
            for key in &pk.columns {
                if !seen.contains(key) {
                    return Err(PlanError::UnknownKeyColumn { table, column: key.to_string() });
                }
                if !key_seen.insert(key) {
                    return Err(PlanError::DuplicateKeyColumn { table, column: key.to_string() });
                }
            }
        }
        Ok(())
    }
}

/// Kind of catalog object an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Extension,
    Schema,
    Table,
    Column,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::Column => "column",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single idempotent structural intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaOp {
    /// Database-wide and irreversible; gated separately from the rest.
    Extension { name: Ident },
    Schema { name: Ident },
    Table(TableSpec),
    Column { table: QualifiedName, column: ColumnSpec },
}

impl SchemaOp {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Extension { .. } => ObjectKind::Extension,
            Self::Schema { .. } => ObjectKind::Schema,
            Self::Table(_) => ObjectKind::Table,
            Self::Column { .. } => ObjectKind::Column,
        }
    }

    /// Whether applying this operation changes state outside any one namespace.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Extension { .. })
    }

    /// Human-readable target name, used in logs and error context.
    pub fn target(&self) -> String {
        match self {
            Self::Extension { name } | Self::Schema { name } => name.to_string(),
            Self::Table(spec) => spec.name.to_string(),
            Self::Column { table, column } => format!("{table}.{}", column.name),
        }
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        match self {
            Self::Extension { .. } | Self::Schema { .. } => Ok(()),
            Self::Table(spec) => spec.validate(),
            Self::Column { column, .. } => column.validate(),
        }
    }
}

/// Ordered operations. Order matters: later operations may depend on earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub operations: Vec<SchemaOp>,
}

impl Plan {
    pub fn new(operations: Vec<SchemaOp>) -> Self {
        Self { operations }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, PlanError> {
        Ok(toml::from_str(source)?)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// First operation that changes database-wide state, if any.
    pub fn first_global(&self) -> Option<(usize, &SchemaOp)> {
        self.operations.iter().enumerate().find(|(_, op)| op.is_global())
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        for (index, op) in self.operations.iter().enumerate() {
            op.validate().map_err(|source| PlanError::Operation { index, source: Box::new(source) })?;
        }
        Ok(())
    }
}

impl FromIterator<SchemaOp> for Plan {
    fn from_iter<I: IntoIterator<Item = SchemaOp>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
