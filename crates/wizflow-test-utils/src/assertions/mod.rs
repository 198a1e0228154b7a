//! Assertion utilities for engine state.

use thiserror::Error;
use wizflow_core::{WorkflowContext, WorkflowEngine, WorkflowStatus};

/// Mismatch found by an assertion helper
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineStateError {
    /// The run is in another status
    #[error("Invalid status: expected {expected:?}, got {actual:?}")]
    Status {
        /// Expected status
        expected: WorkflowStatus,
        /// Actual status
        actual: WorkflowStatus,
    },

    /// Another step is active
    #[error("Invalid step: expected {expected:?}, got {actual:?}")]
    Step {
        /// Expected title
        expected: String,
        /// Active title, if any
        actual: Option<String>,
    },

    /// The step list differs
    #[error("Invalid steps: expected {expected:?}, got {actual:?}")]
    Steps {
        /// Expected titles
        expected: Vec<String>,
        /// Actual titles
        actual: Vec<String>,
    },
}

/// Checks that the run is active on the step titled `title`
pub async fn assert_on_step<C: WorkflowContext>(
    engine: &WorkflowEngine<C>,
    title: &str,
) -> Result<(), EngineStateError> {
    let status = engine.status().await;
    if status != WorkflowStatus::Running {
        return Err(EngineStateError::Status {
            expected: WorkflowStatus::Running,
            actual: status,
        });
    }

    let actual = engine.current_step().await.map(|s| s.title);
    if actual.as_deref() != Some(title) {
        return Err(EngineStateError::Step {
            expected: title.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Checks the titles of the whole step list
pub async fn assert_step_titles<C: WorkflowContext>(
    engine: &WorkflowEngine<C>,
    expected: &[&str],
) -> Result<(), EngineStateError> {
    let actual: Vec<String> = engine.steps().await.into_iter().map(|s| s.title).collect();
    if actual != expected {
        return Err(EngineStateError::Steps {
            expected: expected.iter().map(|t| t.to_string()).collect(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wizflow_core::{Step, WorkflowDefinition};

    #[derive(Debug, Clone, Default)]
    struct Ctx;

    #[tokio::test]
    async fn test_assertions_report_mismatch() {
        let engine = WorkflowEngine::<Ctx>::default();
        assert!(matches!(
            assert_on_step(&engine, "One").await,
            Err(EngineStateError::Status { .. })
        ));

        let def = WorkflowDefinition::new("Test").with_step(Step::new("One", "one-form").last_step());
        engine.start_workflow(def).await.unwrap();

        assert_on_step(&engine, "One").await.unwrap();
        assert_step_titles(&engine, &["One"]).await.unwrap();
        assert!(assert_step_titles(&engine, &["Two"]).await.is_err());
    }
}
