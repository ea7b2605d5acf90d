//! Fixtures and module declarations for storage tests.

use mitch_core::{CatalogError, ColumnSpec, Ident, Outcome, PrimaryKey, QualifiedName, SchemaOp, TableSpec};

use crate::MemoryCatalog;

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn ident(s: &str) -> Ident {
    Ident::new(s).unwrap()
}

#[expect(clippy::unwrap_used, reason = "test code")]
pub fn qualified(s: &str) -> QualifiedName {
    s.parse().unwrap()
}

pub fn users_table() -> TableSpec {
    TableSpec::new(
        qualified("test123.users"),
        vec![
            ColumnSpec::new(ident("id"), "bigserial").not_null(),
            ColumnSpec::new(ident("username"), "citext").not_null().unique(),
            ColumnSpec::new(ident("created_at"), "timestamptz").not_null().default_expr("now()"),
        ],
        Some(PrimaryKey::new(vec![ident("id")])),
    )
}

pub fn users_ops() -> Vec<SchemaOp> {
    vec![
        SchemaOp::Extension { name: ident("citext") },
        SchemaOp::Schema { name: ident("test123") },
        SchemaOp::Table(users_table()),
    ]
}

pub fn text_column_ops() -> Vec<SchemaOp> {
    ["irgendwas", "irgendwas2"]
        .into_iter()
        .map(|name| SchemaOp::Column { table: qualified("test123.users"), column: ColumnSpec::new(ident(name), "text") })
        .collect()
}

/// Apply in order, stopping at the first error.
pub async fn apply_all(catalog: &mut MemoryCatalog, ops: &[SchemaOp]) -> Result<Vec<Outcome>, CatalogError> {
    let mut outcomes = Vec::with_capacity(ops.len());
    for op in ops {
        outcomes.push(op.apply(catalog).await?);
    }
    Ok(outcomes)
}

#[cfg(feature = "postgres")]
mod pg_tests;
