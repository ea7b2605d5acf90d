//! Service layer for mitch
//!
//! Runs a whole [`Plan`](mitch_core::Plan) against a catalog: validation,
//! global-change gating, the advisory lock, ordered application and the report.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

mod converger;
mod error;
mod report;

pub use converger::Converger;
pub use error::ConvergeError;
pub use report::{ConvergeReport, StepReport};
