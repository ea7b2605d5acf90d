//! Guarded PostgreSQL DDL for each operation.
//!
//! Identifiers are always quoted. Type names are checked by plan validation
//! before they reach here; default expressions are emitted verbatim.

use crate::ident::{Ident, QualifiedName};
use crate::plan::{ColumnSpec, Plan, SchemaOp, TableSpec};

pub fn create_extension(name: &Ident) -> String {
    format!("CREATE EXTENSION IF NOT EXISTS {}", name.quoted())
}

pub fn create_schema(name: &Ident) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", name.quoted())
}

/// `"name" type [NOT NULL] [DEFAULT expr] [UNIQUE]`
pub fn column_definition(column: &ColumnSpec) -> String {
    let mut def = format!("{} {}", column.name.quoted(), column.data_type.trim());
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(expr) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(expr.trim());
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    def
}

pub fn create_table(table: &TableSpec) -> String {
    let mut lines: Vec<String> = table.columns.iter().map(column_definition).collect();
    if let Some(pk) = &table.primary_key {
        let keys: Vec<String> = pk.columns.iter().map(Ident::quoted).collect();
        lines.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }
    format!("CREATE TABLE IF NOT EXISTS {} (\n    {}\n)", table.name.quoted(), lines.join(",\n    "))
}

pub fn add_column(table: &QualifiedName, column: &ColumnSpec) -> String {
    format!("ALTER TABLE {} ADD COLUMN IF NOT EXISTS {}", table.quoted(), column_definition(column))
}

pub fn render(op: &SchemaOp) -> String {
    match op {
        SchemaOp::Extension { name } => create_extension(name),
        SchemaOp::Schema { name } => create_schema(name),
        SchemaOp::Table(spec) => create_table(spec),
        SchemaOp::Column { table, column } => add_column(table, column),
    }
}

impl Plan {
    /// The whole plan as a re-runnable SQL script.
    pub fn to_sql(&self) -> String {
        self.operations.iter().map(|op| format!("{};\n", render(op))).collect::<Vec<_>>().join("\n")
    }
}
