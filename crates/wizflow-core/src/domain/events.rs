use crate::domain::run::RunId;
use crate::WorkflowError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Domain event trait for all events of a workflow run
pub trait WorkflowEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the run this event belongs to
    fn run_id(&self) -> &RunId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

macro_rules! workflow_event {
    ($name:ident, $event_type:literal) => {
        impl WorkflowEvent for $name {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn run_id(&self) -> &RunId {
                &self.run_id
            }

            fn timestamp(&self) -> DateTime<Utc> {
                self.timestamp
            }
        }
    };
}

/// Event: a run started (or restarted)
#[derive(Debug)]
pub struct WorkflowStarted {
    /// The run
    pub run_id: RunId,
    /// Wizard title
    pub title: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(WorkflowStarted, "workflow.started");

/// Event: the definition was swapped while running
#[derive(Debug)]
pub struct WorkflowRedefined {
    /// The run
    pub run_id: RunId,
    /// New wizard title
    pub title: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(WorkflowRedefined, "workflow.redefined");

/// Event: a step became visible
#[derive(Debug)]
pub struct StepEntered {
    /// The run
    pub run_id: RunId,
    /// Step position
    pub step_index: usize,
    /// Step title
    pub title: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(StepEntered, "workflow.step_entered");

/// Event: the run moved from one step to another
#[derive(Debug)]
pub struct StepAdvanced {
    /// The run
    pub run_id: RunId,
    /// Step that was left
    pub from_index: usize,
    /// Step that is now active
    pub to_index: usize,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(StepAdvanced, "workflow.step_advanced");

/// Event: a step's `on_next` handler failed
#[derive(Debug)]
pub struct StepFailed {
    /// The run
    pub run_id: RunId,
    /// Step position
    pub step_index: usize,
    /// Message surfaced to the user
    pub error: String,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(StepFailed, "workflow.step_failed");

/// Event: a sub-flow was spliced into the step list
#[derive(Debug)]
pub struct SubflowAppended {
    /// The run
    pub run_id: RunId,
    /// Step count kept from the static definition
    pub static_count: usize,
    /// Steps appended after them
    pub appended: usize,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(SubflowAppended, "workflow.subflow_appended");

/// Event: a handler resolved after its run was cancelled or restarted
#[derive(Debug)]
pub struct StaleCompletionDiscarded {
    /// The run that was active when the completion arrived
    pub run_id: RunId,
    /// Step the handler belonged to
    pub step_index: usize,
    /// Generation the handler was started in
    pub generation: u64,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(StaleCompletionDiscarded, "workflow.stale_completion_discarded");

/// Event: the user cancelled the run
#[derive(Debug)]
pub struct WorkflowCancelled {
    /// The run
    pub run_id: RunId,
    /// Step that was active
    pub step_index: usize,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(WorkflowCancelled, "workflow.cancelled");

/// Event: the run reached its end
#[derive(Debug)]
pub struct WorkflowFinished {
    /// The run
    pub run_id: RunId,
    /// When it happened
    pub timestamp: DateTime<Utc>,
}
workflow_event!(WorkflowFinished, "workflow.finished");

/// Handler for domain events
#[async_trait]
pub trait WorkflowEventHandler: Send + Sync {
    /// Handle a domain event
    async fn handle_event(&self, event: Box<dyn WorkflowEvent>) -> Result<(), WorkflowError>;
}

/// Writes every event to the tracing subscriber
#[derive(Debug, Default, Clone)]
pub struct LoggingEventHandler;

#[async_trait]
impl WorkflowEventHandler for LoggingEventHandler {
    async fn handle_event(&self, event: Box<dyn WorkflowEvent>) -> Result<(), WorkflowError> {
        match event.event_type() {
            "workflow.step_failed" | "workflow.stale_completion_discarded" => {
                warn!(run_id = %event.run_id(), event = ?event, "{}", event.event_type())
            }
            "workflow.started" | "workflow.finished" | "workflow.cancelled" => {
                info!(run_id = %event.run_id(), "{}", event.event_type())
            }
            _ => debug!(run_id = %event.run_id(), event = ?event, "{}", event.event_type()),
        }
        Ok(())
    }
}
