use mitch_core::{CatalogError, ColumnInfo, ColumnSpec, Ident, ObjectKind, Outcome, Plan, PrimaryKey, SchemaOp, TableSpec};
use mitch_storage::MemoryCatalog;

use crate::{ConvergeError, Converger};

fn ident(s: &str) -> Ident {
    Ident::new(s).unwrap()
}

fn users_plan() -> Plan {
    Plan::new(vec![
        SchemaOp::Extension { name: ident("citext") },
        SchemaOp::Schema { name: ident("test123") },
        SchemaOp::Table(TableSpec::new(
            "test123.users".parse().unwrap(),
            vec![
                ColumnSpec::new(ident("id"), "bigserial").not_null(),
                ColumnSpec::new(ident("username"), "citext").not_null().unique(),
                ColumnSpec::new(ident("created_at"), "timestamptz").not_null().default_expr("now()"),
            ],
            Some(PrimaryKey::new(vec![ident("id")])),
        )),
    ])
}

fn text_columns_plan() -> Plan {
    ["irgendwas", "irgendwas2"]
        .into_iter()
        .map(|name| SchemaOp::Column {
            table: "test123.users".parse().unwrap(),
            column: ColumnSpec::new(ident(name), "text"),
        })
        .collect()
}

fn converger() -> Converger {
    Converger::new().allow_global_changes(true)
}

#[tokio::test]
async fn first_run_creates_everything() {
    let mut catalog = MemoryCatalog::new();
    let report = converger().converge(&mut catalog, &users_plan()).await.unwrap();

    assert_eq!(report.changes(), 3);
    assert!(!report.is_noop());
    let kinds: Vec<ObjectKind> = report.steps.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, [ObjectKind::Extension, ObjectKind::Schema, ObjectKind::Table]);
    assert_eq!(report.steps[2].target, "test123.users");

    let users = catalog.relation(&"test123.users".parse().unwrap()).unwrap().unwrap();
    assert_eq!(users.columns.len(), 3);
    assert_eq!(users.unique_constraints, vec![vec![ident("username")]]);
}

#[tokio::test]
async fn second_run_is_a_noop() {
    let mut catalog = MemoryCatalog::new();
    converger().converge(&mut catalog, &users_plan()).await.unwrap();
    let before = catalog.snapshot().unwrap();

    let report = converger().converge(&mut catalog, &users_plan()).await.unwrap();
    assert!(report.is_noop());
    assert_eq!(report.drifted().count(), 0);
    assert!(report.steps.iter().all(|s| s.outcome == Outcome::AlreadyPresent));
    assert_eq!(catalog.snapshot().unwrap(), before);
}

#[tokio::test]
async fn column_plan_adds_two_then_nothing() {
    let mut catalog = MemoryCatalog::new();
    converger().converge(&mut catalog, &users_plan()).await.unwrap();

    let report = Converger::new().converge(&mut catalog, &text_columns_plan()).await.unwrap();
    assert_eq!(report.changes(), 2);
    let report = Converger::new().converge(&mut catalog, &text_columns_plan()).await.unwrap();
    assert!(report.is_noop());

    let users = catalog.relation(&"test123.users".parse().unwrap()).unwrap().unwrap();
    assert_eq!(users.columns.len(), 5);
    assert!(users.column("irgendwas").unwrap().nullable);
    assert!(users.column("irgendwas2").unwrap().nullable);
}

#[tokio::test]
async fn column_before_table_fails_at_its_index() {
    let mut catalog = MemoryCatalog::new();
    let mut ops = users_plan().operations;
    ops.insert(2, text_columns_plan().operations.remove(0));

    let err = converger().converge(&mut catalog, &Plan::new(ops)).await.unwrap_err();
    assert_eq!(err.index(), Some(2));
    assert!(matches!(err.catalog_error(), Some(CatalogError::DependencyMissing(_))), "{err}");
    assert!(!err.touched_nothing());
    assert!(err.to_string().contains("test123.users.irgendwas"), "{err}");
}

#[tokio::test]
async fn permission_error_stops_the_run() {
    let mut catalog = MemoryCatalog::new().revoke(ObjectKind::Table);
    let err = converger().converge(&mut catalog, &users_plan()).await.unwrap_err();

    let ConvergeError::Step { index, ref target, ref source } = err else {
        panic!("expected step error");
    };
    assert_eq!(index, 2);
    assert_eq!(target, "test123.users");
    assert!(matches!(source, CatalogError::PermissionDenied(_)));
}

#[tokio::test]
async fn drift_is_reported_not_repaired() {
    let mut catalog = MemoryCatalog::new();
    converger().converge(&mut catalog, &users_plan()).await.unwrap();
    catalog
        .seed_table("test123.legacy".parse().unwrap(), vec![ColumnInfo {
            name: ident("irgendwas"),
            data_type: "integer".to_owned(),
            nullable: true,
        }])
        .unwrap();

    let plan = Plan::new(vec![SchemaOp::Column {
        table: "test123.legacy".parse().unwrap(),
        column: ColumnSpec::new(ident("irgendwas"), "text"),
    }]);
    let report = Converger::new().converge(&mut catalog, &plan).await.unwrap();

    assert!(report.is_noop());
    let drifted: Vec<_> = report.drifted().collect();
    assert_eq!(drifted.len(), 1);
    assert!(report.to_string().contains("1 drifted"));
    let legacy = catalog.relation(&"test123.legacy".parse().unwrap()).unwrap().unwrap();
    assert_eq!(legacy.columns[0].data_type, "integer");
}

#[tokio::test]
async fn report_serializes_outcomes_inline() {
    let mut catalog = MemoryCatalog::new();
    let report = converger().converge(&mut catalog, &users_plan()).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["steps"][0]["kind"], "extension");
    assert_eq!(json["steps"][0]["outcome"], "created");
    assert_eq!(json["steps"][2]["target"], "test123.users");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn simultaneous_runs_match_a_single_run() {
    let plan: Plan = users_plan().operations.into_iter().chain(text_columns_plan().operations).collect();
    let mut single = MemoryCatalog::new();
    converger().converge(&mut single, &plan).await.unwrap();
    let expected = single.snapshot().unwrap();

    for _ in 0..20 {
        let shared = MemoryCatalog::new();
        let runs: Vec<_> = (0..2)
            .map(|_| {
                let mut catalog = shared.clone();
                let plan = plan.clone();
                tokio::spawn(async move { converger().converge(&mut catalog, &plan).await })
            })
            .collect();
        let mut changes = 0;
        for run in runs {
            changes += run.await.unwrap().unwrap().changes();
        }
        assert_eq!(changes, plan.len(), "each object created exactly once");
        assert_eq!(shared.snapshot().unwrap(), expected);
    }
}
