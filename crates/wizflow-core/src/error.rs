use crate::domain::validation::ValidationErrors;
use thiserror::Error;

/// Core error type for the workflow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The workflow definition is malformed
    #[error("Invalid workflow definition: {0}")]
    InvalidDefinition(String),

    /// A state transition was requested from the wrong state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The operation needs a running workflow
    #[error("Workflow is not running")]
    NotRunning,

    /// A handler for the given step is still pending
    #[error("A handler for step {0} is still in flight")]
    AdvanceInProgress(usize),

    /// The step's ready gate is closed
    #[error("Step {0} is not ready")]
    StepNotReady(usize),

    /// No step exists at the given index
    #[error("Step index out of range: {0}")]
    StepOutOfRange(usize),

    /// The active step's form did not validate
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<ValidationErrors> for WorkflowError {
    fn from(errors: ValidationErrors) -> Self {
        WorkflowError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let mut validation = ValidationErrors::new();
        validation.add("name", "Name is required");

        let errors = vec![
            (WorkflowError::InvalidDefinition("empty".to_string()), "Invalid workflow definition: empty"),
            (WorkflowError::InvalidTransition("idle".to_string()), "Invalid transition: idle"),
            (WorkflowError::NotRunning, "Workflow is not running"),
            (WorkflowError::AdvanceInProgress(2), "A handler for step 2 is still in flight"),
            (WorkflowError::StepNotReady(1), "Step 1 is not ready"),
            (WorkflowError::StepOutOfRange(9), "Step index out of range: 9"),
            (WorkflowError::Validation(validation), "Validation error: name: Name is required"),
            (WorkflowError::ConfigurationError("bad".to_string()), "Configuration error: bad"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_from_validation_errors() {
        let mut validation = ValidationErrors::new();
        validation.add("repo", "Select a repository");

        let error: WorkflowError = validation.clone().into();
        match error {
            WorkflowError::Validation(inner) => assert_eq!(inner, validation),
            _ => panic!("Expected Validation variant"),
        }
    }
}
