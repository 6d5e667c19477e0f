//! Pipeline error types.

use thiserror::Error;

use kontrol_host::HostError;
use kontrol_state::HostCommand;

use crate::matcher::FilterError;
use crate::template::TemplateError;

/// A pipeline run failed at one step; remaining steps were not executed.
#[derive(Debug, Error)]
#[error("step {step} ({command}) failed: {source}")]
pub struct PipelineError {
    /// Zero-based index of the failing step.
    pub step: usize,
    pub command: HostCommand,
    #[source]
    pub source: StepError,
}

/// Why a single step failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("target {0:?} is not in the object store")]
    UnknownTarget(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("no container id: target object has no string `Id` field")]
    MissingContainerId,

    #[error("invalid options for {0}: expected a string")]
    InvalidOptions(HostCommand),

    #[error(transparent)]
    Host(#[from] HostError),
}
