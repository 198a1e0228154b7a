//! Wizards wired to in-memory collaborators.

use crate::implementations::{
    InMemoryAutoscalerPolicyApi, InMemoryPipelineApi, InMemorySourceControl, RecordingOAuth,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use wizflow_core::{WorkflowEngine, WorkflowError, WorkflowEvent, WorkflowEventHandler};
use wizflow_pipeline::{
    AddPipelineWorkflow, AutoscalerContext, EditAutoscalerPolicyWorkflow, PipelineContext,
    PipelineServices,
};

/// Event handler remembering the type of every event it receives
#[derive(Debug, Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<&'static str>>,
}

impl RecordingEventHandler {
    /// Event types received so far, in order
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    /// Number of events of `event_type`
    pub fn count(&self, event_type: &str) -> usize {
        self.events.lock().iter().filter(|e| **e == event_type).count()
    }
}

#[async_trait]
impl WorkflowEventHandler for RecordingEventHandler {
    async fn handle_event(&self, event: Box<dyn WorkflowEvent>) -> Result<(), WorkflowError> {
        self.events.lock().push(event.event_type());
        Ok(())
    }
}

/// Add-pipeline wizard over in-memory fakes
pub struct PipelineHarness {
    /// The controller under test
    pub workflow: Arc<AddPipelineWorkflow>,
    /// Engine the controller drives
    pub engine: Arc<WorkflowEngine<PipelineContext>>,
    /// Source-control fake
    pub source_control: InMemorySourceControl,
    /// Backend fake
    pub pipelines: InMemoryPipelineApi,
    /// OAuth fake
    pub oauth: RecordingOAuth,
    /// Events emitted by the engine
    pub events: Arc<RecordingEventHandler>,
}

/// Builder for [`PipelineHarness`]
#[derive(Default)]
pub struct PipelineHarnessBuilder {
    source_control: Option<InMemorySourceControl>,
    pipelines: Option<InMemoryPipelineApi>,
    oauth: Option<RecordingOAuth>,
}

impl PipelineHarnessBuilder {
    /// Starts with empty fakes
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `source_control`
    pub fn with_source_control(mut self, source_control: InMemorySourceControl) -> Self {
        self.source_control = Some(source_control);
        self
    }

    /// Use `pipelines`
    pub fn with_pipelines(mut self, pipelines: InMemoryPipelineApi) -> Self {
        self.pipelines = Some(pipelines);
        self
    }

    /// Use `oauth`
    pub fn with_oauth(mut self, oauth: RecordingOAuth) -> Self {
        self.oauth = Some(oauth);
        self
    }

    /// Wire everything together
    pub fn build(self) -> PipelineHarness {
        let source_control = self.source_control.unwrap_or_default();
        let pipelines = self.pipelines.unwrap_or_else(InMemoryPipelineApi::new);
        let oauth = self.oauth.unwrap_or_default();
        let events = Arc::new(RecordingEventHandler::default());

        let engine = Arc::new(WorkflowEngine::new(events.clone()));
        let services = PipelineServices {
            source_control: Arc::new(source_control.clone()),
            pipelines: Arc::new(pipelines.clone()),
            oauth: Arc::new(oauth.clone()),
        };
        let workflow = Arc::new(AddPipelineWorkflow::new(engine.clone(), services));

        PipelineHarness {
            workflow,
            engine,
            source_control,
            pipelines,
            oauth,
            events,
        }
    }
}

impl PipelineHarness {
    /// Builder with empty fakes
    pub fn builder() -> PipelineHarnessBuilder {
        PipelineHarnessBuilder::new()
    }

    /// Titles of the current step list
    pub async fn step_titles(&self) -> Vec<String> {
        self.engine.steps().await.into_iter().map(|s| s.title).collect()
    }
}

/// Autoscaler editor over an in-memory policy store
pub struct AutoscalerHarness {
    /// The controller under test
    pub workflow: Arc<EditAutoscalerPolicyWorkflow>,
    /// Engine the controller drives
    pub engine: Arc<WorkflowEngine<AutoscalerContext>>,
    /// Policy store
    pub api: InMemoryAutoscalerPolicyApi,
}

impl AutoscalerHarness {
    /// Wire the editor to `api`
    pub fn new(api: InMemoryAutoscalerPolicyApi) -> Self {
        let engine = Arc::new(WorkflowEngine::default());
        let workflow = Arc::new(EditAutoscalerPolicyWorkflow::new(engine.clone(), Arc::new(api.clone())));
        Self { workflow, engine, api }
    }
}
