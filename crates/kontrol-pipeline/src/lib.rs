//! kontrol-pipeline — the action pipeline interpreter.
//!
//! Executes one ordered list of remediation steps against a per-run
//! [`ObjectStore`], threading results between steps:
//!
//! 1. resolve the step's `target` (root host handle when unset),
//! 2. render `options` templates against the store,
//! 3. invoke the command on the host,
//! 4. narrow collection results through the step's filter, unwrapping a
//!    single match,
//! 5. store the value under `result` for later steps,
//! 6. evict the `target` entry after a removal command.
//!
//! Any step error aborts the remaining steps of the run and surfaces as
//! a [`PipelineError`] carrying the failing step index.

pub mod error;
pub mod interpreter;
pub mod matcher;
pub mod store;
pub mod template;

pub use error::{PipelineError, StepError};
pub use interpreter::run_steps;
pub use matcher::Matcher;
pub use store::ObjectStore;
