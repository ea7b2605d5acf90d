//! Fixtures and module declarations for core tests.

use crate::{ColumnSpec, Ident, Plan, PrimaryKey, QualifiedName, SchemaOp, TableSpec};

pub fn ident(s: &str) -> Ident {
    Ident::new(s).unwrap()
}

pub fn users_table() -> TableSpec {
    TableSpec::new(
        "test123.users".parse().unwrap(),
        vec![
            ColumnSpec::new(ident("id"), "bigserial").not_null(),
            ColumnSpec::new(ident("username"), "citext").not_null().unique(),
            ColumnSpec::new(ident("created_at"), "timestamptz").not_null().default_expr("now()"),
        ],
        Some(PrimaryKey::new(vec![ident("id")])),
    )
}

pub fn users_plan() -> Plan {
    Plan::new(vec![
        SchemaOp::Extension { name: ident("citext") },
        SchemaOp::Schema { name: ident("test123") },
        SchemaOp::Table(users_table()),
    ])
}

pub fn users_table_name() -> QualifiedName {
    "test123.users".parse().unwrap()
}
