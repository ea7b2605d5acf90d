//! Typed error enum for plan-level convergence.
//!
//! Carries the index and target of the operation that stopped the run, so a
//! caller can point at the offending plan entry without parsing messages.

use mitch_core::{CatalogError, PlanError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvergeError {
    /// The plan failed validation. Nothing was touched.
    #[error("invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    /// The plan contains a database-wide operation and the converger was not
    /// allowed to make global changes. Nothing was touched.
    #[error("operation {index} ({target}) changes the whole database; global changes are not permitted")]
    GlobalChangeNotPermitted { index: usize, target: String },

    /// The advisory lock could not be taken.
    #[error("acquiring convergence lock: {0}")]
    Lock(#[source] CatalogError),

    /// Operation `index` failed; earlier operations were applied.
    #[error("operation {index} ({target}): {source}")]
    Step {
        index: usize,
        target: String,
        #[source]
        source: CatalogError,
    },
}

impl ConvergeError {
    /// The catalog failure underneath, if the run got as far as the catalog.
    pub fn catalog_error(&self) -> Option<&CatalogError> {
        match self {
            Self::Lock(e) | Self::Step { source: e, .. } => Some(e),
            Self::InvalidPlan(_) | Self::GlobalChangeNotPermitted { .. } => None,
        }
    }

    /// Index of the plan entry the error is about.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::GlobalChangeNotPermitted { index, .. } | Self::Step { index, .. } => Some(*index),
            Self::InvalidPlan(PlanError::Operation { index, .. }) => Some(*index),
            Self::InvalidPlan(_) | Self::Lock(_) => None,
        }
    }

    /// Whether the catalog was left exactly as it was found.
    pub fn touched_nothing(&self) -> bool {
        !matches!(self, Self::Step { .. })
    }

    pub fn is_transient(&self) -> bool {
        self.catalog_error().is_some_and(CatalogError::is_transient)
    }
}
