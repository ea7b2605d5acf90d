use std::path::Path;

use anyhow::Result;

use crate::load_plan;

pub(crate) fn run(plan_path: &Path) -> Result<()> {
    let plan = load_plan(plan_path)?;
    print!("{}", plan.to_sql());
    Ok(())
}
