use std::path::Path;

use anyhow::Result;

use crate::load_plan;

pub(crate) fn run(plan_path: &Path) -> Result<()> {
    let plan = load_plan(plan_path)?;
    let global = plan.operations.iter().filter(|op| op.is_global()).count();
    println!("{}: {} operation(s), {global} global", plan_path.display(), plan.len());
    Ok(())
}
