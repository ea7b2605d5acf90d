//! In-process catalog modelled on PostgreSQL's.
//!
//! Clones share one state, so two clones behave like two sessions against the
//! same database. Every creating call re-checks under the lock and reports
//! `AlreadyExists` instead of creating twice.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mitch_core::{
    Catalog, CatalogError, ColumnInfo, ColumnSpec, DEFAULT_SCHEMA, Ident, MAX_IDENTIFIER_LEN, ObjectKind, QualifiedName,
    RelationKind, TableSpec, base_type, canonical_type, is_serial,
};

/// Built-in base types of a stock PostgreSQL server (`pg_type` with
/// `typtype` in `b`, `r`, `m`), in `format_type` spelling.
const BUILTIN_TYPES: &[&str] = &[
    // numeric
    "smallint",
    "integer",
    "bigint",
    "numeric",
    "real",
    "double precision",
    "money",
    // character
    "character varying",
    "character",
    "text",
    "name",
    "bytea",
    // date/time
    "timestamp without time zone",
    "timestamp with time zone",
    "date",
    "time without time zone",
    "time with time zone",
    "interval",
    "boolean",
    // network
    "inet",
    "cidr",
    "macaddr",
    "macaddr8",
    // geometric
    "point",
    "line",
    "lseg",
    "box",
    "path",
    "polygon",
    "circle",
    "bit",
    "bit varying",
    // text search
    "tsvector",
    "tsquery",
    "uuid",
    "xml",
    "json",
    "jsonb",
    "jsonpath",
    // ranges and multiranges
    "int4range",
    "int8range",
    "numrange",
    "tsrange",
    "tstzrange",
    "daterange",
    "int4multirange",
    "int8multirange",
    "nummultirange",
    "tsmultirange",
    "tstzmultirange",
    "datemultirange",
    // object identifiers
    "oid",
    "regclass",
    "regcollation",
    "regconfig",
    "regdictionary",
    "regnamespace",
    "regoper",
    "regoperator",
    "regproc",
    "regprocedure",
    "regrole",
    "regtype",
    // system
    "xid",
    "xid8",
    "cid",
    "tid",
    "pg_lsn",
    "pg_snapshot",
    "txid_snapshot",
    "refcursor",
    "aclitem",
];

/// Extensions the simulated server can install, with the types they bring.
const AVAILABLE_EXTENSIONS: &[(&str, &[&str])] = &[
    ("citext", &["citext"]),
    ("hstore", &["hstore"]),
    ("uuid-ossp", &[]),
    ("pgcrypto", &[]),
];

/// `<name1>_<name2>_<label>`, trimming the longer of the two names first
/// until the result fits in an identifier. The label is never trimmed.
fn object_name(name1: &str, name2: &str, label: &str) -> String {
    let available = MAX_IDENTIFIER_LEN.saturating_sub(label.len() + 2);
    let (mut len1, mut len2) = (name1.len(), name2.len());
    while len1 + len2 > available {
        if len1 > len2 {
            len1 -= 1;
        } else {
            len2 -= 1;
        }
    }
    format!("{}_{}_{label}", clip(name1, len1), clip(name2, len2))
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char boundary.
fn clip(s: &str, max: usize) -> &str {
    let end = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len())).take_while(|&i| i <= max).last();
    &s[..end.unwrap_or(0)]
}

#[derive(Debug, Clone)]
struct Relation {
    kind: RelationKind,
    columns: Vec<ColumnInfo>,
    primary_key: Vec<Ident>,
    unique: Vec<Vec<Ident>>,
}

impl Relation {
    fn bare(kind: RelationKind) -> Self {
        Self { kind, columns: Vec::new(), primary_key: Vec::new(), unique: Vec::new() }
    }
}

#[derive(Debug)]
struct CatalogState {
    available: BTreeMap<String, Vec<String>>,
    extensions: BTreeSet<Ident>,
    schemas: BTreeSet<Ident>,
    relations: BTreeMap<QualifiedName, Relation>,
    revoked: BTreeSet<ObjectKind>,
}

impl CatalogState {
    fn new() -> Self {
        let available = AVAILABLE_EXTENSIONS
            .iter()
            .map(|(name, types)| ((*name).to_owned(), types.iter().map(|t| (*t).to_owned()).collect()))
            .collect();
        let mut schemas = BTreeSet::new();
        if let Ok(public) = Ident::new(DEFAULT_SCHEMA) {
            schemas.insert(public);
        }
        Self { available, extensions: BTreeSet::new(), schemas, relations: BTreeMap::new(), revoked: BTreeSet::new() }
    }

    fn check_privilege(&self, kind: ObjectKind, target: &dyn std::fmt::Display) -> Result<(), CatalogError> {
        if self.revoked.contains(&kind) {
            return Err(CatalogError::PermissionDenied(format!("permission denied to create {kind} {target}")));
        }
        Ok(())
    }

    fn check_type(&self, data_type: &str) -> Result<(), CatalogError> {
        let base = base_type(data_type);
        let bare = base.rsplit('.').next().unwrap_or(base.as_str());
        let builtin = BUILTIN_TYPES.contains(&bare);
        let from_extension = self
            .extensions
            .iter()
            .filter_map(|ext| self.available.get(ext.as_str()))
            .any(|types| types.iter().any(|t| t == bare));
        if builtin || from_extension {
            Ok(())
        } else {
            Err(CatalogError::UndefinedType(format!("type \"{data_type}\" does not exist")))
        }
    }

    /// First free `<table>_<column>_seq[N]` in the table's schema, with the
    /// table and column parts shortened to fit an identifier.
    fn sequence_name(&self, table: &QualifiedName, column: &Ident) -> Result<QualifiedName, CatalogError> {
        let mut pass = 0_u32;
        loop {
            let label = if pass == 0 { "seq".to_owned() } else { format!("seq{pass}") };
            let candidate = object_name(table.name.as_str(), column.as_str(), &label);
            let ident = Ident::new(candidate).map_err(|e| CatalogError::Internal(e.to_string()))?;
            let name = table.sibling(ident);
            if !self.relations.contains_key(&name) {
                return Ok(name);
            }
            pass += 1;
        }
    }

    fn column_info(column: &ColumnSpec, in_primary_key: bool) -> ColumnInfo {
        ColumnInfo {
            name: column.name.clone(),
            data_type: canonical_type(&column.data_type),
            nullable: column.nullable && !in_primary_key,
        }
    }

    fn add_owned_sequence(&mut self, table: &QualifiedName, column: &ColumnSpec) -> Result<(), CatalogError> {
        if is_serial(&column.data_type) {
            let sequence = self.sequence_name(table, &column.name)?;
            self.relations.insert(sequence, Relation::bare(RelationKind::Sequence));
        }
        Ok(())
    }
}

/// One relation as seen in a [`CatalogSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSnapshot {
    pub kind: RelationKind,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Vec<Ident>,
    pub unique_constraints: Vec<Vec<Ident>>,
}

impl RelationSnapshot {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Structural state, comparable across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub extensions: Vec<String>,
    pub schemas: Vec<String>,
    pub relations: BTreeMap<String, RelationSnapshot>,
}

impl CatalogSnapshot {
    /// Relations of the given kind, by qualified name.
    pub fn relations_of_kind(&self, kind: RelationKind) -> Vec<&str> {
        self.relations.iter().filter(|(_, r)| r.kind == kind).map(|(name, _)| name.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_state<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, CatalogError> {
    mutex
        .lock()
        .map_err(|e: PoisonError<_>| CatalogError::Internal(format!("catalog lock poisoned: {e}")))
}

impl MemoryCatalog {
    /// Empty database: schema `public`, built-in types, nothing installed.
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(CatalogState::new())) }
    }

    /// Make another extension installable.
    #[must_use]
    pub fn with_available_extension(self, name: &str, types: &[&str]) -> Self {
        if let Ok(mut state) = lock_state(&self.state) {
            state.available.insert(name.to_owned(), types.iter().map(|t| (*t).to_owned()).collect());
        }
        self
    }

    /// Deny creation of one object kind, as a role without the privilege.
    #[must_use]
    pub fn revoke(self, kind: ObjectKind) -> Self {
        if let Ok(mut state) = lock_state(&self.state) {
            state.revoked.insert(kind);
        }
        self
    }

    /// Bind a name to a column-less relation of another kind (view, sequence, ...).
    pub fn seed_relation(&self, name: QualifiedName, kind: RelationKind) -> Result<(), CatalogError> {
        let mut state = lock_state(&self.state)?;
        state.schemas.insert(name.schema.clone());
        state.relations.insert(name, Relation::bare(kind));
        Ok(())
    }

    /// Bind a name to a table with the given columns, outside any plan.
    pub fn seed_table(&self, name: QualifiedName, columns: Vec<ColumnInfo>) -> Result<(), CatalogError> {
        let mut state = lock_state(&self.state)?;
        state.schemas.insert(name.schema.clone());
        state.relations.insert(name, Relation { columns, ..Relation::bare(RelationKind::Table) });
        Ok(())
    }

    pub fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        let state = lock_state(&self.state)?;
        Ok(CatalogSnapshot {
            extensions: state.extensions.iter().map(ToString::to_string).collect(),
            schemas: state.schemas.iter().map(ToString::to_string).collect(),
            relations: state
                .relations
                .iter()
                .map(|(name, rel)| {
                    (name.to_string(), RelationSnapshot {
                        kind: rel.kind,
                        columns: rel.columns.clone(),
                        primary_key: rel.primary_key.clone(),
                        unique_constraints: rel.unique.clone(),
                    })
                })
                .collect(),
        })
    }

    pub fn relation(&self, name: &QualifiedName) -> Result<Option<RelationSnapshot>, CatalogError> {
        Ok(self.snapshot()?.relations.remove(&name.to_string()))
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn has_extension(&mut self, name: &Ident) -> Result<bool, CatalogError> {
        Ok(lock_state(&self.state)?.extensions.contains(name))
    }

    async fn create_extension(&mut self, name: &Ident) -> Result<(), CatalogError> {
        let mut state = lock_state(&self.state)?;
        state.check_privilege(ObjectKind::Extension, name)?;
        if state.extensions.contains(name) {
            return Err(CatalogError::AlreadyExists(format!("extension \"{name}\" already exists")));
        }
        if !state.available.contains_key(name.as_str()) {
            return Err(CatalogError::DependencyMissing(format!(
                "extension \"{name}\" is not available on this server"
            )));
        }
        state.extensions.insert(name.clone());
        tracing::trace!(extension = %name, "memory catalog: extension installed");
        Ok(())
    }

    async fn has_schema(&mut self, name: &Ident) -> Result<bool, CatalogError> {
        Ok(lock_state(&self.state)?.schemas.contains(name))
    }

    async fn create_schema(&mut self, name: &Ident) -> Result<(), CatalogError> {
        let mut state = lock_state(&self.state)?;
        state.check_privilege(ObjectKind::Schema, name)?;
        if !state.schemas.insert(name.clone()) {
            return Err(CatalogError::AlreadyExists(format!("schema \"{name}\" already exists")));
        }
        tracing::trace!(schema = %name, "memory catalog: schema created");
        Ok(())
    }

    async fn relation_kind(&mut self, name: &QualifiedName) -> Result<Option<RelationKind>, CatalogError> {
        Ok(lock_state(&self.state)?.relations.get(name).map(|rel| rel.kind))
    }

    async fn create_table(&mut self, table: &TableSpec) -> Result<(), CatalogError> {
        let mut state = lock_state(&self.state)?;
        state.check_privilege(ObjectKind::Table, &table.name)?;
        if !state.schemas.contains(&table.name.schema) {
            return Err(CatalogError::DependencyMissing(format!(
                "schema \"{}\" does not exist",
                table.name.schema
            )));
        }
        if let Some(existing) = state.relations.get(&table.name) {
            return Err(if existing.kind.is_table() {
                CatalogError::AlreadyExists(format!("relation \"{}\" already exists", table.name))
            } else {
                CatalogError::NameConflict(format!("\"{}\" is a {}", table.name, existing.kind.as_str()))
            });
        }
        for column in &table.columns {
            state.check_type(&column.data_type)?;
        }

        let primary_key = table.primary_key.as_ref().map(|pk| pk.columns.clone()).unwrap_or_default();
        let columns = table
            .columns
            .iter()
            .map(|c| CatalogState::column_info(c, primary_key.contains(&c.name)))
            .collect();
        let unique = table.columns.iter().filter(|c| c.unique).map(|c| vec![c.name.clone()]).collect();
        for column in &table.columns {
            state.add_owned_sequence(&table.name, column)?;
        }
        state.relations.insert(table.name.clone(), Relation { kind: RelationKind::Table, columns, primary_key, unique });
        tracing::trace!(table = %table.name, "memory catalog: table created");
        Ok(())
    }

    async fn columns(&mut self, table: &QualifiedName) -> Result<Vec<ColumnInfo>, CatalogError> {
        lock_state(&self.state)?
            .relations
            .get(table)
            .map(|rel| rel.columns.clone())
            .ok_or_else(|| CatalogError::DependencyMissing(format!("relation \"{table}\" does not exist")))
    }

    async fn add_column(&mut self, table: &QualifiedName, column: &ColumnSpec) -> Result<(), CatalogError> {
        let mut state = lock_state(&self.state)?;
        state.check_privilege(ObjectKind::Column, &format!("{table}.{}", column.name))?;
        let kind = state
            .relations
            .get(table)
            .map(|rel| rel.kind)
            .ok_or_else(|| CatalogError::DependencyMissing(format!("relation \"{table}\" does not exist")))?;
        if !kind.is_table() {
            return Err(CatalogError::NameConflict(format!("\"{table}\" is a {}", kind.as_str())));
        }
        state.check_type(&column.data_type)?;
        let duplicate = state.relations.get(table).is_some_and(|rel| rel.columns.iter().any(|c| c.name == column.name));
        if duplicate {
            return Err(CatalogError::AlreadyExists(format!(
                "column \"{}\" of relation \"{table}\" already exists",
                column.name
            )));
        }
        state.add_owned_sequence(table, column)?;

        let rel = state
            .relations
            .get_mut(table)
            .ok_or_else(|| CatalogError::Internal(format!("relation \"{table}\" vanished")))?;
        rel.columns.push(CatalogState::column_info(column, false));
        if column.unique {
            rel.unique.push(vec![column.name.clone()]);
        }
        tracing::trace!(table = %table, column = %column.name, "memory catalog: column added");
        Ok(())
    }
}
