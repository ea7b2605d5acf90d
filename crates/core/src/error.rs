//! Typed error enums for plans and catalogs.
//!
//! `PlanError` is raised before any database access. `CatalogError` comes back
//! from a `Catalog` backend and is what the convergence operations classify:
//! `AlreadyExists` is absorbed as success, everything else is fatal to a run.

use thiserror::Error;

/// A plan that cannot be applied as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("invalid identifier {value:?}: {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },

    #[error("invalid type name {0:?}")]
    InvalidTypeName(String),

    #[error("table {table} declares no columns")]
    EmptyTable { table: String },

    #[error("table {table} declares column {column} more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("primary key of {table} is empty")]
    EmptyPrimaryKey { table: String },

    #[error("primary key of {table} references undeclared column {column}")]
    UnknownKeyColumn { table: String, column: String },

    #[error("primary key of {table} lists column {column} more than once")]
    DuplicateKeyColumn { table: String, column: String },

    #[error("operation {index}: {source}")]
    Operation {
        index: usize,
        #[source]
        source: Box<PlanError>,
    },

    #[error("plan file: {0}")]
    Parse(String),
}

impl From<toml::de::Error> for PlanError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Catalog-level failure reported by a backend.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The object is already there. Never surfaced from a convergence run.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A scope the operation needs (schema, table, extension package) is absent.
    #[error("dependency missing: {0}")]
    DependencyMissing(String),

    /// The acting role may not create this kind of object.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The name is bound to an object of an incompatible kind.
    #[error("name conflict: {0}")]
    NameConflict(String),

    /// A column references a type the database does not know.
    #[error("undefined type: {0}")]
    UndefinedType(String),

    /// Any other SQL / connection failure.
    #[cfg(feature = "sqlx-errors")]
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Backend-internal failure (poisoned lock, unreadable catalog row).
    #[error("catalog error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Whether this error means the object is already present.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Whether this error is likely transient (worth retrying the whole run).
    pub fn is_transient(&self) -> bool {
        #[cfg(feature = "sqlx-errors")]
        if let Self::Database(err) = self {
            return matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_));
        }
        false
    }
}

/// Custom `From<sqlx::Error>`, NOT blanket `#[from]`.
///
/// - 42P06 / 42P07 / 42701 / 42710 / 23505 → `AlreadyExists` (a concurrent
///   `CREATE ... IF NOT EXISTS` surfaces as a unique violation on the system catalog)
/// - 42501 → `PermissionDenied`
/// - 3F000 / 42P01 → `DependencyMissing`
/// - 42809 → `NameConflict`
/// - 42704 → `UndefinedType`
/// - Everything else → `Database`
#[cfg(feature = "sqlx-errors")]
impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        let sqlx::Error::Database(db_err) = &err else {
            return Self::Database(err);
        };
        let message = db_err.message().to_owned();
        match db_err.code().as_deref() {
            Some("42P06" | "42P07" | "42701" | "42710" | "23505") => Self::AlreadyExists(message),
            Some("42501") => Self::PermissionDenied(message),
            Some("3F000" | "42P01") => Self::DependencyMissing(message),
            Some("42809") => Self::NameConflict(message),
            Some("42704") => Self::UndefinedType(message),
            _ => Self::Database(err),
        }
    }
}
