use crate::remote::RemoteError;
use thiserror::Error;
use wizflow_core::{StepOutcome, WorkflowError};

/// Error type of the pipeline wizards
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Engine rejected the operation
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A remote call failed
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Input needed by the operation has not been collected yet
    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    /// A step failed with a message meant for the user
    #[error("{0}")]
    StepFailed(String),
}

impl PipelineError {
    /// Message suitable for display on the failing step
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Workflow(e) => e.to_string(),
            PipelineError::Remote(e) => e.user_message(),
            PipelineError::MissingInput(field) => format!("Please select a {} first.", field),
            PipelineError::StepFailed(message) => message.clone(),
        }
    }
}

/// Result type of the pipeline wizards
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Map a handler result onto the engine's step outcome
pub(crate) fn outcome(result: PipelineResult<()>) -> StepOutcome {
    match result {
        Ok(()) => StepOutcome::Success,
        Err(e) => StepOutcome::failure(e.user_message()),
    }
}
