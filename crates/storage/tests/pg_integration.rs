//! Integration tests for PgCatalog.
//! Run with: DATABASE_URL=... cargo test -p mitch-storage -- --ignored pg_
//!
//! Every test works inside a transaction that is rolled back, under a schema
//! name unique to the test.

#![cfg(feature = "postgres")]
#![allow(clippy::unwrap_used, reason = "integration test code")]

use std::time::Duration;

use mitch_core::{
    Catalog, CatalogError, ColumnSpec, Ident, Outcome, PrimaryKey, QualifiedName, RelationKind, SchemaOp, TableSpec,
};
use mitch_storage::{PgCatalog, connect};
use sqlx::PgPool;
use uuid::Uuid;

async fn create_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for PgCatalog integration tests");
    connect(&url, Duration::from_secs(10)).await.expect("Failed to connect to PostgreSQL")
}

fn unique_schema() -> Ident {
    Ident::new(format!("mitch_test_{}", Uuid::new_v4().simple())).unwrap()
}

fn ident(s: &str) -> Ident {
    Ident::new(s).unwrap()
}

fn users_ops(schema: &Ident) -> Vec<SchemaOp> {
    let table = QualifiedName::new(schema.clone(), ident("users"));
    vec![
        SchemaOp::Schema { name: schema.clone() },
        SchemaOp::Table(TableSpec::new(
            table.clone(),
            vec![
                ColumnSpec::new(ident("id"), "bigserial").not_null(),
                ColumnSpec::new(ident("username"), "text").not_null().unique(),
                ColumnSpec::new(ident("created_at"), "timestamptz").not_null().default_expr("now()"),
            ],
            Some(PrimaryKey::new(vec![ident("id")])),
        )),
        SchemaOp::Column { table: table.clone(), column: ColumnSpec::new(ident("irgendwas"), "text") },
        SchemaOp::Column { table, column: ColumnSpec::new(ident("irgendwas2"), "text") },
    ]
}

async fn apply_all(catalog: &mut PgCatalog<'_>, ops: &[SchemaOp]) -> Result<Vec<Outcome>, CatalogError> {
    let mut outcomes = Vec::with_capacity(ops.len());
    for op in ops {
        outcomes.push(op.apply(catalog).await?);
    }
    Ok(outcomes)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn pg_converges_and_reruns_cleanly() {
    let pool = create_pool().await;
    let mut tx = pool.begin().await.unwrap();
    let schema = unique_schema();
    let ops = users_ops(&schema);

    let mut catalog = PgCatalog::new(&mut tx);
    catalog.acquire_lock().await.unwrap();
    let first = apply_all(&mut catalog, &ops).await.unwrap();
    assert!(first.iter().all(|o| *o == Outcome::Created), "{first:?}");
    let second = apply_all(&mut catalog, &ops).await.unwrap();
    assert!(second.iter().all(|o| *o == Outcome::AlreadyPresent), "{second:?}");

    let table = QualifiedName::new(schema.clone(), ident("users"));
    let columns = catalog.columns(&table).await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "username", "created_at", "irgendwas", "irgendwas2"]);
    assert_eq!(columns[0].data_type, "bigint");
    assert_eq!(columns[2].data_type, "timestamp with time zone");
    assert!(!columns[0].nullable);
    assert!(columns[3].nullable);

    let sequence = QualifiedName::new(schema, ident("users_id_seq"));
    assert_eq!(catalog.relation_kind(&sequence).await.unwrap(), Some(RelationKind::Sequence));

    drop(catalog);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn pg_column_before_table_is_dependency_missing() {
    let pool = create_pool().await;
    let mut tx = pool.begin().await.unwrap();
    let schema = unique_schema();
    let mut ops = users_ops(&schema);
    ops.swap(1, 2);

    let mut catalog = PgCatalog::new(&mut tx);
    let err = apply_all(&mut catalog, &ops).await.unwrap_err();
    assert!(matches!(err, CatalogError::DependencyMissing(_)), "{err}");

    drop(catalog);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn pg_failed_create_leaves_transaction_usable() {
    let pool = create_pool().await;
    let mut tx = pool.begin().await.unwrap();
    let schema = unique_schema();

    let mut catalog = PgCatalog::new(&mut tx);
    catalog.create_schema(&schema).await.unwrap();
    let table = TableSpec::new(
        QualifiedName::new(schema.clone(), ident("bad")),
        vec![ColumnSpec::new(ident("x"), "no_such_type_anywhere")],
        None,
    );
    let err = catalog.create_table(&table).await.unwrap_err();
    assert!(matches!(err, CatalogError::UndefinedType(_)), "{err}");

    assert!(catalog.has_schema(&schema).await.unwrap(), "savepoint rolled back only the failed statement");

    drop(catalog);
    tx.rollback().await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn pg_view_is_a_name_conflict() {
    let pool = create_pool().await;
    let mut tx = pool.begin().await.unwrap();
    let schema = unique_schema();

    sqlx::raw_sql(&format!("CREATE SCHEMA {0}; CREATE VIEW {0}.users AS SELECT 1 AS id", schema.quoted()))
        .execute(&mut *tx)
        .await
        .unwrap();

    let mut catalog = PgCatalog::new(&mut tx);
    let err = apply_all(&mut catalog, &users_ops(&schema)).await.unwrap_err();
    assert!(matches!(err, CatalogError::NameConflict(_)), "{err}");

    drop(catalog);
    tx.rollback().await.unwrap();
}
