use mitch_core::{Catalog, Outcome, Plan};

use crate::error::ConvergeError;
use crate::report::{ConvergeReport, StepReport};

#[cfg(test)]
mod scenario_tests;

/// Applies plans in order, stopping at the first fatal error.
///
/// Database-wide operations (extensions) are refused unless
/// [`allow_global_changes`](Self::allow_global_changes) was set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Converger {
    allow_global: bool,
}

impl Converger {
    #[must_use]
    pub const fn new() -> Self {
        Self { allow_global: false }
    }

    #[must_use]
    pub const fn allow_global_changes(mut self, allow: bool) -> Self {
        self.allow_global = allow;
        self
    }

    /// Validate, gate, lock, then apply every operation in plan order.
    ///
    /// Checks that can fail without touching the catalog run first. Once
    /// application starts, earlier operations stay applied when a later one
    /// fails; wrapping the catalog in a transaction is the caller's business.
    pub async fn converge<C: Catalog + ?Sized>(
        &self,
        catalog: &mut C,
        plan: &Plan,
    ) -> Result<ConvergeReport, ConvergeError> {
        plan.validate()?;
        if !self.allow_global
            && let Some((index, op)) = plan.first_global()
        {
            tracing::warn!(index, target = %op.target(), "refusing global operation");
            return Err(ConvergeError::GlobalChangeNotPermitted { index, target: op.target() });
        }

        catalog.acquire_lock().await.map_err(ConvergeError::Lock)?;
        tracing::info!(operations = plan.len(), "converging");

        let mut report = ConvergeReport { steps: Vec::with_capacity(plan.len()) };
        for (index, op) in plan.operations.iter().enumerate() {
            let target = op.target();
            let kind = op.kind();
            let outcome = match op.apply(catalog).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    tracing::error!(index, %kind, %target, error = %source, "operation failed");
                    return Err(ConvergeError::Step { index, target, source });
                },
            };
            match &outcome {
                Outcome::Created => tracing::info!(index, %kind, %target, "created"),
                Outcome::AlreadyPresent => tracing::debug!(index, %kind, %target, "already present"),
                Outcome::Drifted { details } => {
                    tracing::warn!(index, %kind, %target, drift = %details.join("; "), "present but drifted; left unchanged");
                },
            }
            report.steps.push(StepReport { index, kind, target, outcome });
        }

        tracing::info!(changes = report.changes(), drifted = report.drifted().count(), "convergence complete");
        Ok(report)
    }
}
