use crate::{
    domain::events::{
        StepAdvanced, StepEntered, StepFailed, WorkflowCancelled, WorkflowEvent, WorkflowFinished,
        WorkflowStarted,
    },
    WorkflowError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Workflow run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    /// No run has been started
    Idle,

    /// A step is active
    Running,

    /// The user abandoned the run
    Cancelled,

    /// The last step was left successfully
    Finished,
}

/// Value object: Run ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate: one run of a wizard
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Unique identifier, renewed on every start
    pub id: RunId,

    /// Current status
    pub status: WorkflowStatus,

    /// Index of the active step
    pub step_index: usize,

    /// Bumped on every start, cancel and finish; a handler started in an
    /// older generation must not touch shared state
    pub generation: u64,

    /// Message of the last failed `on_next`
    pub last_error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// Domain events
    #[serde(skip)]
    pub events: Vec<Box<dyn WorkflowEvent>>,
}

// Domain events are not cloned
impl Clone for WorkflowRun {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            status: self.status,
            step_index: self.step_index,
            generation: self.generation,
            last_error: self.last_error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            events: Vec::new(),
        }
    }
}

impl Default for WorkflowRun {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRun {
    /// Create an idle run
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: RunId(Uuid::new_v4().to_string()),
            status: WorkflowStatus::Idle,
            step_index: 0,
            generation: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            events: Vec::with_capacity(8),
        }
    }

    /// Start a fresh run at step 0.
    ///
    /// Allowed from every state except `Running`; callers restarting a live
    /// run cancel it first.
    pub fn start(&mut self, title: &str) -> Result<(), WorkflowError> {
        if self.status == WorkflowStatus::Running {
            return Err(WorkflowError::InvalidTransition(format!(
                "Cannot start workflow in state: {:?}",
                self.status
            )));
        }

        let now = Utc::now();
        self.id = RunId(Uuid::new_v4().to_string());
        self.status = WorkflowStatus::Running;
        self.step_index = 0;
        self.generation += 1;
        self.last_error = None;
        self.created_at = now;
        self.updated_at = now;

        self.record_event(Box::new(WorkflowStarted {
            run_id: self.id.clone(),
            title: title.to_string(),
            timestamp: now,
        }));

        Ok(())
    }

    /// Whether a handler started in `generation` may still commit
    #[inline]
    pub fn is_active(&self, generation: u64) -> bool {
        self.status == WorkflowStatus::Running && self.generation == generation
    }

    /// Record that the active step became visible
    pub fn enter_step(&mut self, title: &str) -> Result<(), WorkflowError> {
        self.ensure_running("enter step")?;

        self.record_event(Box::new(StepEntered {
            run_id: self.id.clone(),
            step_index: self.step_index,
            title: title.to_string(),
            timestamp: Utc::now(),
        }));
        Ok(())
    }

    /// Move forward to the next step
    pub fn advance_to(&mut self, index: usize) -> Result<(), WorkflowError> {
        self.ensure_running("advance")?;

        if index != self.step_index + 1 {
            return Err(WorkflowError::InvalidTransition(format!(
                "Cannot advance from step {} to step {}",
                self.step_index, index
            )));
        }

        self.move_to(index);
        Ok(())
    }

    /// Move back to an already visited step
    pub fn rewind_to(&mut self, index: usize) -> Result<(), WorkflowError> {
        self.ensure_running("rewind")?;

        if index >= self.step_index {
            return Err(WorkflowError::InvalidTransition(format!(
                "Cannot rewind from step {} to step {}",
                self.step_index, index
            )));
        }

        self.move_to(index);
        Ok(())
    }

    /// Restart at step 0 of a replaced definition
    pub fn reset_position(&mut self) -> Result<(), WorkflowError> {
        self.ensure_running("redefine")?;
        self.step_index = 0;
        self.last_error = None;
        self.update_timestamp();
        Ok(())
    }

    /// Record a failed `on_next`; the step stays active
    pub fn fail_step(&mut self, error: String) -> Result<(), WorkflowError> {
        self.ensure_running("fail step")?;

        self.last_error = Some(error.clone());
        self.record_event(Box::new(StepFailed {
            run_id: self.id.clone(),
            step_index: self.step_index,
            error,
            timestamp: Utc::now(),
        }));
        self.update_timestamp();
        Ok(())
    }

    /// Abandon the run
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        self.ensure_running("cancel")?;

        self.status = WorkflowStatus::Cancelled;
        self.generation += 1;
        self.record_event(Box::new(WorkflowCancelled {
            run_id: self.id.clone(),
            step_index: self.step_index,
            timestamp: Utc::now(),
        }));
        self.update_timestamp();
        Ok(())
    }

    /// Complete the run
    pub fn finish(&mut self) -> Result<(), WorkflowError> {
        self.ensure_running("finish")?;

        self.status = WorkflowStatus::Finished;
        self.generation += 1;
        self.last_error = None;
        self.record_event(Box::new(WorkflowFinished {
            run_id: self.id.clone(),
            timestamp: Utc::now(),
        }));
        self.update_timestamp();
        Ok(())
    }

    /// Add a domain event
    #[inline]
    pub fn record_event(&mut self, event: Box<dyn WorkflowEvent>) {
        self.events.push(event);
    }

    /// Drain the buffered domain events
    pub fn take_events(&mut self) -> Vec<Box<dyn WorkflowEvent>> {
        std::mem::take(&mut self.events)
    }

    /// Update the timestamp
    #[inline]
    pub fn update_timestamp(&mut self) {
        self.updated_at = Utc::now();
    }

    fn move_to(&mut self, index: usize) {
        let from_index = self.step_index;
        self.step_index = index;
        self.last_error = None;
        self.record_event(Box::new(StepAdvanced {
            run_id: self.id.clone(),
            from_index,
            to_index: index,
            timestamp: Utc::now(),
        }));
        self.update_timestamp();
    }

    fn ensure_running(&self, action: &str) -> Result<(), WorkflowError> {
        if self.status != WorkflowStatus::Running {
            return Err(WorkflowError::InvalidTransition(format!(
                "Cannot {} while workflow is in state: {:?}",
                action, self.status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> WorkflowRun {
        let mut run = WorkflowRun::new();
        run.start("Add Pipeline").unwrap();
        run.events.clear();
        run
    }

    #[test]
    fn test_new_run_is_idle() {
        let run = WorkflowRun::new();
        assert_eq!(run.status, WorkflowStatus::Idle);
        assert_eq!(run.generation, 0);
        assert!(!run.is_active(0));
    }

    #[test]
    fn test_start_bumps_generation_and_renews_id() {
        let mut run = WorkflowRun::new();
        let first_id = run.id.clone();

        run.start("Add Pipeline").unwrap();
        assert_eq!(run.status, WorkflowStatus::Running);
        assert_eq!(run.generation, 1);
        assert_ne!(run.id, first_id);
        assert!(run.is_active(1));
        assert_eq!(run.take_events().len(), 1);
    }

    #[test]
    fn test_start_while_running_fails() {
        let mut run = running();
        match run.start("Again") {
            Err(WorkflowError::InvalidTransition(msg)) => {
                assert!(msg.contains("Cannot start workflow in state"));
            }
            other => panic!("Expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn test_advance_only_to_next_index() {
        let mut run = running();
        run.advance_to(1).unwrap();
        assert_eq!(run.step_index, 1);

        assert!(run.advance_to(3).is_err());
        assert!(run.advance_to(1).is_err());
        assert_eq!(run.step_index, 1);
    }

    #[test]
    fn test_fail_step_keeps_position() {
        let mut run = running();
        run.advance_to(1).unwrap();
        run.fail_step("binding failed".to_string()).unwrap();

        assert_eq!(run.step_index, 1);
        assert_eq!(run.last_error.as_deref(), Some("binding failed"));

        run.advance_to(2).unwrap();
        assert!(run.last_error.is_none());
    }

    #[test]
    fn test_rewind() {
        let mut run = running();
        run.advance_to(1).unwrap();
        run.advance_to(2).unwrap();

        run.rewind_to(0).unwrap();
        assert_eq!(run.step_index, 0);
        assert!(run.rewind_to(0).is_err());
    }

    #[test]
    fn test_cancel_invalidates_generation() {
        let mut run = running();
        let generation = run.generation;

        run.cancel().unwrap();
        assert_eq!(run.status, WorkflowStatus::Cancelled);
        assert!(!run.is_active(generation));
        assert!(run.cancel().is_err());

        run.start("Add Pipeline").unwrap();
        assert!(!run.is_active(generation));
        assert_eq!(run.step_index, 0);
    }

    #[test]
    fn test_finish() {
        let mut run = running();
        run.finish().unwrap();
        assert_eq!(run.status, WorkflowStatus::Finished);
        assert!(run.enter_step("late").is_err());
        assert!(run.fail_step("late".to_string()).is_err());
    }

    #[test]
    fn test_clone_drops_events() {
        let mut run = WorkflowRun::new();
        run.start("Add Pipeline").unwrap();
        let cloned = run.clone();
        assert!(cloned.events.is_empty());
        assert_eq!(cloned.id, run.id);
    }
}
