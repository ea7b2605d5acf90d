//! Converge a live database (or an in-memory stand-in) to a plan file.
//!
//! The whole run is one transaction: committed when every operation
//! succeeded, rolled back otherwise.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use mitch_core::{
    CONNECT_TIMEOUT_ENV, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LOCK_KEY, LOCK_KEY_ENV, Plan, env_parse_with_default,
};
use mitch_service::{ConvergeReport, Converger};
use mitch_storage::{MemoryCatalog, PgCatalog, connect};

use crate::load_plan;

pub(crate) async fn run(plan_path: &Path, allow_global: bool, dry_run: bool, json: bool) -> Result<()> {
    let plan = load_plan(plan_path)?;
    if !allow_global && let Some((index, op)) = plan.first_global() {
        bail!(
            "operation {index} ({} {}) changes the whole database; pass --allow-global to permit it",
            op.kind(),
            op.target()
        );
    }
    let converger = Converger::new().allow_global_changes(allow_global);

    let report = if dry_run { run_in_memory(&converger, &plan).await? } else { run_on_database(&converger, &plan).await? };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

async fn run_in_memory(converger: &Converger, plan: &Plan) -> Result<ConvergeReport> {
    tracing::info!("dry run against an empty in-memory catalog");
    let mut catalog = MemoryCatalog::new();
    Ok(converger.converge(&mut catalog, plan).await?)
}

async fn run_on_database(converger: &Converger, plan: &Plan) -> Result<ConvergeReport> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set for apply"))?;
    let timeout = Duration::from_secs(env_parse_with_default(CONNECT_TIMEOUT_ENV, DEFAULT_CONNECT_TIMEOUT_SECS));
    let lock_key = env_parse_with_default(LOCK_KEY_ENV, DEFAULT_LOCK_KEY);

    let pool = connect(&database_url, timeout).await.context("connecting to PostgreSQL")?;
    let mut tx = pool.begin().await.context("beginning transaction")?;

    let result = {
        let mut catalog = PgCatalog::new(&mut tx).with_lock_key(lock_key);
        converger.converge(&mut catalog, plan).await
    };

    let outcome = match result {
        Ok(report) => {
            tx.commit().await.context("committing convergence transaction")?;
            Ok(report)
        },
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            tracing::error!(touched_nothing = err.touched_nothing(), "convergence aborted, transaction rolled back");
            Err(anyhow::Error::new(err).context("convergence aborted; no changes were committed"))
        },
    };
    pool.close().await;
    outcome
}
