use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mitch_core::Plan;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mitch")]
#[command(about = "Idempotent schema provisioning for PostgreSQL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge the database in DATABASE_URL to the plan, in one transaction
    Apply {
        plan: PathBuf,
        /// Permit database-wide operations such as CREATE EXTENSION
        #[arg(long)]
        allow_global: bool,
        /// Converge an empty in-memory catalog instead of the database
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the plan as a SQL script
    Render { plan: PathBuf },
    /// Parse and validate the plan without touching a database
    Validate { plan: PathBuf },
}

pub(crate) fn load_plan(path: &Path) -> Result<Plan> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading plan {}", path.display()))?;
    let plan = Plan::from_toml_str(&source).with_context(|| format!("parsing plan {}", path.display()))?;
    plan.validate().with_context(|| format!("validating plan {}", path.display()))?;
    Ok(plan)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply { plan, allow_global, dry_run, json } => {
            commands::apply::run(&plan, allow_global, dry_run, json).await?;
        },
        Commands::Render { plan } => commands::render::run(&plan)?,
        Commands::Validate { plan } => commands::validate::run(&plan)?,
    }

    Ok(())
}
