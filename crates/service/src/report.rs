use std::fmt;

use mitch_core::{ObjectKind, Outcome};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub kind: ObjectKind,
    pub target: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Per-operation outcomes of one successful run, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvergeReport {
    pub steps: Vec<StepReport>,
}

impl ConvergeReport {
    /// Number of operations that changed the catalog.
    pub fn changes(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_change()).count()
    }

    pub fn is_noop(&self) -> bool {
        self.changes() == 0
    }

    pub fn drifted(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| matches!(s.outcome, Outcome::Drifted { .. }))
    }
}

impl fmt::Display for ConvergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            writeln!(f, "[{}] {} {}: {}", step.index, step.kind, step.target, step.outcome)?;
        }
        write!(f, "{} operation(s), {} change(s), {} drifted", self.steps.len(), self.changes(), self.drifted().count())
    }
}
