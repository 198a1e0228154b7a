use crate::{
    domain::context::{rebase, ContextEdit, WorkflowContext},
    domain::definition::WorkflowDefinition,
    domain::events::{
        LoggingEventHandler, StaleCompletionDiscarded, SubflowAppended, WorkflowEventHandler,
        WorkflowRedefined,
    },
    domain::run::{RunId, WorkflowRun, WorkflowStatus},
    domain::step::{Step, StepHandler, StepOutcome, StepView},
    domain::subflow::splice_steps,
    WorkflowError,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of a user "next" action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The run moved to the step at this index
    Advanced(usize),
    /// The handler failed; the run stays on the step
    Failed(String),
    /// The last step was left and the run finished
    Finished,
    /// The run was cancelled or restarted while the handler was suspended
    Discarded,
}

/// The handler currently suspended, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    generation: u64,
    step_index: usize,
}

/// An `on_enter` handler claimed under the lock, to be run outside it
struct PendingEnter<C> {
    index: usize,
    handler: Arc<dyn StepHandler<C>>,
    working: C,
    generation: u64,
}

struct EngineState<C> {
    run: WorkflowRun,
    title: String,
    allow_back: bool,
    allow_jump: bool,
    cancel_label: String,
    steps: Vec<Step<C>>,
    static_count: usize,
    context: C,
    in_flight: Option<InFlight>,
    pending_edits: Vec<ContextEdit<C>>,
}

impl<C: WorkflowContext> EngineState<C> {
    fn new() -> Self {
        Self {
            run: WorkflowRun::new(),
            title: String::new(),
            allow_back: false,
            allow_jump: false,
            cancel_label: String::new(),
            steps: Vec::new(),
            static_count: 0,
            context: C::default(),
            in_flight: None,
            pending_edits: Vec::new(),
        }
    }

    fn install(&mut self, definition: WorkflowDefinition<C>) {
        self.static_count = definition.static_step_count();
        self.title = definition.title;
        self.allow_back = definition.allow_back;
        self.allow_jump = definition.allow_jump;
        self.cancel_label = definition.cancel_label;
        self.steps = definition.steps;
    }

    fn ensure_running(&self) -> Result<(), WorkflowError> {
        if self.run.status != WorkflowStatus::Running {
            return Err(WorkflowError::NotRunning);
        }
        Ok(())
    }

    fn ensure_idle_handler(&self) -> Result<(), WorkflowError> {
        match self.in_flight {
            Some(flight) => Err(WorkflowError::AdvanceInProgress(flight.step_index)),
            None => Ok(()),
        }
    }

    fn step(&self, index: usize) -> Result<&Step<C>, WorkflowError> {
        self.steps
            .get(index)
            .ok_or(WorkflowError::StepOutOfRange(index))
    }

    fn begin_handler(&mut self, step_index: usize) -> u64 {
        let generation = self.run.generation;
        self.in_flight = Some(InFlight {
            generation,
            step_index,
        });
        self.pending_edits.clear();
        generation
    }

    /// Clear the in-flight marker if it still belongs to this handler
    fn end_handler(&mut self, generation: u64, step_index: usize) {
        if self.in_flight
            == Some(InFlight {
                generation,
                step_index,
            })
        {
            self.in_flight = None;
        }
    }

    /// Whether a handler's working copy may replace the shared context
    fn may_commit(&self, generation: u64, step_index: usize) -> bool {
        self.run.is_active(generation) && self.run.step_index == step_index
    }

    fn commit(&mut self, working: C) {
        let edits = std::mem::take(&mut self.pending_edits);
        self.context = rebase(working, &edits);
    }

    fn discard(&mut self, generation: u64, step_index: usize) {
        self.run.record_event(Box::new(StaleCompletionDiscarded {
            run_id: self.run.id.clone(),
            step_index,
            generation,
            timestamp: Utc::now(),
        }));
    }

    fn apply_edit(&mut self, edit: ContextEdit<C>) {
        edit(&mut self.context);
        if self.in_flight.is_some() {
            self.pending_edits.push(edit);
        }
    }

    fn reset_context(&mut self) {
        self.context = C::default();
        self.pending_edits.clear();
        self.in_flight = None;
    }

    /// Enter the active step at `index`.
    ///
    /// A step with an `on_enter` handler claims the in-flight slot here, in
    /// the same critical section as the transition that made it active, so
    /// no other transition can slip in before the handler runs.
    fn prepare_enter(&mut self, index: usize) -> Result<Option<PendingEnter<C>>, WorkflowError> {
        self.ensure_running()?;
        let step = self.step(index)?;
        if index != self.run.step_index {
            return Err(WorkflowError::InvalidTransition(format!(
                "Cannot enter step {} while step {} is active",
                index, self.run.step_index
            )));
        }

        let title = step.title.clone();
        let handler = step.on_enter.clone();
        if handler.is_some() {
            self.ensure_idle_handler()?;
        }
        self.run.enter_step(&title)?;

        let Some(handler) = handler else {
            return Ok(None);
        };
        let working = self.context.clone();
        let generation = self.begin_handler(index);
        Ok(Some(PendingEnter {
            index,
            handler,
            working,
            generation,
        }))
    }

    /// Install `definition` over the running run and enter its first step
    fn redefine(&mut self, definition: WorkflowDefinition<C>) -> Result<Option<PendingEnter<C>>, WorkflowError> {
        let title = definition.title.clone();
        self.install(definition);
        self.run.reset_position()?;
        self.run.record_event(Box::new(WorkflowRedefined {
            run_id: self.run.id.clone(),
            title,
            timestamp: Utc::now(),
        }));
        self.prepare_enter(0)
    }

    fn splice(&mut self, subflow: Vec<Step<C>>) {
        let appended = subflow.len();
        self.steps = splice_steps(&self.steps, self.static_count, subflow);
        self.run.record_event(Box::new(SubflowAppended {
            run_id: self.run.id.clone(),
            static_count: self.static_count,
            appended,
            timestamp: Utc::now(),
        }));
    }
}

/// Drives a wizard: sequences steps, gates transitions on readiness,
/// validation and handler results, splices sub-flows and supports
/// cancellation.
///
/// The engine is meant to be shared behind an `Arc`. Its lock is never held
/// while a handler runs.
pub struct WorkflowEngine<C: WorkflowContext> {
    state: Mutex<EngineState<C>>,
    event_handler: Arc<dyn WorkflowEventHandler>,
}

impl<C: WorkflowContext> Default for WorkflowEngine<C> {
    fn default() -> Self {
        Self::new(Arc::new(LoggingEventHandler))
    }
}

impl<C: WorkflowContext> WorkflowEngine<C> {
    /// Create an idle engine publishing events to `event_handler`
    pub fn new(event_handler: Arc<dyn WorkflowEventHandler>) -> Self {
        Self {
            state: Mutex::new(EngineState::new()),
            event_handler,
        }
    }

    /// Start (or restart) a run of `definition`.
    ///
    /// The context is reset to its default, step 0 becomes active and its
    /// `on_enter` handler runs. A live run is cancelled first.
    pub async fn start_workflow(&self, definition: WorkflowDefinition<C>) -> Result<(), WorkflowError> {
        definition.validate()?;

        let pending = {
            let mut state = self.state.lock().await;
            if state.run.status == WorkflowStatus::Running {
                debug!(run_id = %state.run.id, "Restarting a running workflow");
                state.run.cancel()?;
            }

            let title = definition.title.clone();
            state.install(definition);
            state.reset_context();
            state.run.start(&title)?;
            info!(run_id = %state.run.id, title = %title, "Workflow started");
            state.prepare_enter(0)?
        };

        self.dispatch_events().await;
        self.run_enter(pending).await;
        Ok(())
    }

    /// Replace the definition of the running workflow, keeping the context.
    ///
    /// Used when a prefetch shows that the wizard cannot continue as
    /// designed. The run restarts at step 0 of the new definition.
    pub async fn redefine(&self, definition: WorkflowDefinition<C>) -> Result<(), WorkflowError> {
        definition.validate()?;

        let pending = {
            let mut state = self.state.lock().await;
            state.ensure_running()?;
            state.ensure_idle_handler()?;
            state.redefine(definition)?
        };

        self.dispatch_events().await;
        self.run_enter(pending).await;
        Ok(())
    }

    /// Like [`redefine`](Self::redefine), but only while `run_id` is still
    /// the running run.
    ///
    /// Returns `false` and leaves the engine untouched when the run has
    /// ended or was replaced.
    pub async fn redefine_for(
        &self,
        run_id: &RunId,
        definition: WorkflowDefinition<C>,
    ) -> Result<bool, WorkflowError> {
        definition.validate()?;

        let pending = {
            let mut state = self.state.lock().await;
            if state.run.status != WorkflowStatus::Running || state.run.id != *run_id {
                debug!(run_id = %run_id, "Not redefining an inactive run");
                return Ok(false);
            }
            state.ensure_idle_handler()?;
            state.redefine(definition)?
        };

        self.dispatch_events().await;
        self.run_enter(pending).await;
        Ok(true)
    }

    /// Run the `on_enter` handler of the step at `index`, which must be the
    /// active step.
    ///
    /// Failures are not fatal: they are logged and whatever the handler
    /// managed to collect is kept.
    pub async fn enter(&self, index: usize) -> Result<(), WorkflowError> {
        let pending = self.state.lock().await.prepare_enter(index)?;

        self.dispatch_events().await;
        self.run_enter(pending).await;
        Ok(())
    }

    async fn run_enter(&self, pending: Option<PendingEnter<C>>) {
        let Some(PendingEnter {
            index,
            handler,
            mut working,
            generation,
        }) = pending
        else {
            return;
        };

        let outcome = handler.handle(&mut working).await;

        {
            let mut state = self.state.lock().await;
            state.end_handler(generation, index);

            if !state.may_commit(generation, index) {
                debug!(step = index, "Discarding on_enter result of an inactive run");
                state.discard(generation, index);
            } else {
                if let StepOutcome::Failure(message) = &outcome {
                    warn!(run_id = %state.run.id, step = index, error = %message, "on_enter handler failed");
                }
                state.commit(working);
            }
        }

        self.dispatch_events().await;
    }

    /// Handle the user's "next" action on the active step.
    ///
    /// The step must be ready, its form must validate and no other handler
    /// may be suspended. The step's `on_next` runs on a working copy of the
    /// context; on success the run moves on (splicing the step's sub-flow
    /// first), on failure it stays put with the message recorded.
    pub async fn advance(&self) -> Result<AdvanceOutcome, WorkflowError> {
        let (index, step, mut working, generation) = {
            let mut state = self.state.lock().await;
            state.ensure_running()?;
            state.ensure_idle_handler()?;

            let index = state.run.step_index;
            let step = state.step(index)?.clone();
            if !step.ready {
                return Err(WorkflowError::StepNotReady(index));
            }
            if let Some(validator) = &step.validator {
                validator.validate(&state.context)?;
            }

            let generation = state.begin_handler(index);
            (index, step, state.context.clone(), generation)
        };

        let outcome = match &step.on_next {
            Some(handler) => handler.handle(&mut working).await,
            None => StepOutcome::Success,
        };

        let (advanced, pending) = {
            let mut state = self.state.lock().await;
            state.end_handler(generation, index);

            if !state.may_commit(generation, index) {
                debug!(step = index, "Discarding on_next result of an inactive run");
                state.discard(generation, index);
                (AdvanceOutcome::Discarded, None)
            } else {
                // Kept on failure too: work done before the failing call
                // (e.g. a created project id) must survive a retry.
                state.commit(working);

                match outcome {
                    StepOutcome::Failure(message) => {
                        warn!(run_id = %state.run.id, step = index, form = %step.form_name, error = %message, "Step failed");
                        state.run.fail_step(message.clone())?;
                        (AdvanceOutcome::Failed(message), None)
                    }
                    StepOutcome::Success => {
                        if let Some(provider) = &step.subflow {
                            if index < state.static_count {
                                let subflow = provider.subflow(&state.context);
                                state.splice(subflow);
                            } else {
                                warn!(step = index, "Ignoring sub-flow declared by a spliced step");
                            }
                        }

                        let next = index + 1;
                        if step.is_last_step || next >= state.steps.len() {
                            state.run.finish()?;
                            info!(run_id = %state.run.id, "Workflow finished");
                            (AdvanceOutcome::Finished, None)
                        } else {
                            state.run.advance_to(next)?;
                            debug!(run_id = %state.run.id, from = index, to = next, "Step advanced");
                            let pending = state.prepare_enter(next).unwrap_or_else(|e| {
                                warn!(step = next, error = %e, "Could not enter step");
                                None
                            });
                            (AdvanceOutcome::Advanced(next), pending)
                        }
                    }
                }
            }
        };

        self.dispatch_events().await;
        self.run_enter(pending).await;

        Ok(advanced)
    }

    /// Step back one step, when the definition allows it
    pub async fn back(&self) -> Result<usize, WorkflowError> {
        let target = {
            let state = self.state.lock().await;
            state.ensure_running()?;
            if !state.allow_back {
                return Err(WorkflowError::InvalidTransition(
                    "Going back is not allowed in this workflow".to_string(),
                ));
            }
            state.run.step_index.checked_sub(1).ok_or_else(|| {
                WorkflowError::InvalidTransition("Already at the first step".to_string())
            })?
        };

        self.move_back(target).await?;
        Ok(target)
    }

    /// Jump to an already visited step, when the definition allows it
    pub async fn jump_to(&self, index: usize) -> Result<(), WorkflowError> {
        {
            let state = self.state.lock().await;
            state.ensure_running()?;
            if !state.allow_jump {
                return Err(WorkflowError::InvalidTransition(
                    "Jumping between steps is not allowed in this workflow".to_string(),
                ));
            }
        }

        self.move_back(index).await
    }

    async fn move_back(&self, index: usize) -> Result<(), WorkflowError> {
        let pending = {
            let mut state = self.state.lock().await;
            state.ensure_idle_handler()?;
            state.step(index)?;
            state.run.rewind_to(index)?;
            state.prepare_enter(index)?
        };

        self.dispatch_events().await;
        self.run_enter(pending).await;
        Ok(())
    }

    /// Splice `subflow` after the static steps, dropping any previously
    /// spliced steps
    pub async fn append_subflow(&self, subflow: Vec<Step<C>>) -> Result<(), WorkflowError> {
        {
            let mut state = self.state.lock().await;
            state.ensure_running()?;
            if state.run.step_index >= state.static_count {
                return Err(WorkflowError::InvalidTransition(
                    "Cannot replace the sub-flow while one of its steps is active".to_string(),
                ));
            }
            state.splice(subflow);
        }

        self.dispatch_events().await;
        Ok(())
    }

    /// Abandon the run. All collected input is discarded and handlers still
    /// in flight will have their results dropped.
    pub async fn stop_workflow(&self) -> Result<(), WorkflowError> {
        {
            let mut state = self.state.lock().await;
            state.run.cancel()?;
            state.reset_context();
            info!(run_id = %state.run.id, "Workflow cancelled");
        }

        self.dispatch_events().await;
        Ok(())
    }

    /// Complete the run. The context stays readable until the next start.
    pub async fn finish_workflow(&self) -> Result<(), WorkflowError> {
        {
            let mut state = self.state.lock().await;
            state.ensure_idle_handler()?;
            state.run.finish()?;
            info!(run_id = %state.run.id, "Workflow finished");
        }

        self.dispatch_events().await;
        Ok(())
    }

    /// Apply a UI edit to the shared context.
    ///
    /// If a handler is suspended the edit is also replayed on top of the
    /// handler's result when it is committed.
    pub async fn update_context<F>(&self, edit: F) -> Result<(), WorkflowError>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        let mut state = self.state.lock().await;
        state.ensure_running()?;
        state.apply_edit(Arc::new(edit));
        Ok(())
    }

    /// Apply a UI edit only while `run_id` is still the running run.
    ///
    /// Returns `false` and drops the edit when the run has ended or was
    /// replaced, which is how results of remote calls made outside a step
    /// handler are discarded.
    pub async fn update_context_for<F>(&self, run_id: &RunId, edit: F) -> Result<bool, WorkflowError>
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        let mut state = self.state.lock().await;
        if state.run.status != WorkflowStatus::Running || state.run.id != *run_id {
            debug!(run_id = %run_id, "Dropping edit for an inactive run");
            return Ok(false);
        }
        state.apply_edit(Arc::new(edit));
        Ok(true)
    }

    /// Open or close the ready gate of a step
    pub async fn set_ready(&self, index: usize, ready: bool) -> Result<(), WorkflowError> {
        let mut state = self.state.lock().await;
        state.ensure_running()?;
        let step = state
            .steps
            .get_mut(index)
            .ok_or(WorkflowError::StepOutOfRange(index))?;
        step.ready = ready;
        Ok(())
    }

    /// Current run status
    pub async fn status(&self) -> WorkflowStatus {
        self.state.lock().await.run.status
    }

    /// Identifier of the current run
    pub async fn run_id(&self) -> RunId {
        self.state.lock().await.run.id.clone()
    }

    /// Snapshot of the active step
    pub async fn current_step(&self) -> Option<StepView> {
        let state = self.state.lock().await;
        if state.run.status != WorkflowStatus::Running {
            return None;
        }
        let index = state.run.step_index;
        state.steps.get(index).map(|s| StepView::of(index, s))
    }

    /// Snapshots of every step in the current list
    pub async fn steps(&self) -> Vec<StepView> {
        let state = self.state.lock().await;
        state
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| StepView::of(i, s))
            .collect()
    }

    /// Title of the installed definition
    pub async fn title(&self) -> String {
        self.state.lock().await.title.clone()
    }

    /// Label of the cancel button of the installed definition
    pub async fn cancel_label(&self) -> String {
        self.state.lock().await.cancel_label.clone()
    }

    /// Clone of the shared context
    pub async fn context(&self) -> C {
        self.state.lock().await.context.clone()
    }

    /// Read from the shared context without cloning all of it
    pub async fn with_context<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.context)
    }

    /// Message of the last failed `on_next` on the active step
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.run.last_error.clone()
    }

    /// Whether a step handler is currently suspended
    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.in_flight.is_some()
    }

    async fn dispatch_events(&self) {
        let events = self.state.lock().await.run.take_events();

        for event in events {
            if let Err(e) = self.event_handler.handle_event(event).await {
                warn!(error = %e, "Workflow event handler failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::{step_fn, StepHandler};
    use crate::domain::validation::ValidationErrors;
    use async_trait::async_trait;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Ctx {
        name: String,
        visits: u32,
    }

    struct Visit;

    #[async_trait]
    impl StepHandler<Ctx> for Visit {
        async fn handle(&self, ctx: &mut Ctx) -> StepOutcome {
            ctx.visits += 1;
            StepOutcome::Success
        }
    }

    fn definition() -> WorkflowDefinition<Ctx> {
        WorkflowDefinition::new("Test")
            .with_step(Step::new("one", "one-form").with_on_next(Arc::new(Visit)))
            .with_step(Step::new("two", "two-form").with_on_next(Arc::new(Visit)))
            .with_step(Step::new("three", "three-form").last_step())
    }

    #[tokio::test]
    async fn test_linear_run() {
        let engine = WorkflowEngine::<Ctx>::default();
        assert_eq!(engine.status().await, WorkflowStatus::Idle);

        engine.start_workflow(definition()).await.unwrap();
        assert_eq!(engine.current_step().await.unwrap().title, "one");

        assert_eq!(engine.advance().await.unwrap(), AdvanceOutcome::Advanced(1));
        assert_eq!(engine.advance().await.unwrap(), AdvanceOutcome::Advanced(2));
        assert_eq!(engine.advance().await.unwrap(), AdvanceOutcome::Finished);

        assert_eq!(engine.status().await, WorkflowStatus::Finished);
        assert_eq!(engine.context().await.visits, 2);
        assert!(engine.current_step().await.is_none());
    }

    #[tokio::test]
    async fn test_advance_requires_running() {
        let engine = WorkflowEngine::<Ctx>::default();
        assert_eq!(engine.advance().await, Err(WorkflowError::NotRunning));
    }

    #[tokio::test]
    async fn test_not_ready_step_blocks_advance() {
        let engine = WorkflowEngine::<Ctx>::default();
        let def = WorkflowDefinition::new("Gate")
            .with_step(Step::new("gated", "gated-form").with_ready(false))
            .with_step(Step::new("end", "end-form").last_step());
        engine.start_workflow(def).await.unwrap();

        assert_eq!(engine.advance().await, Err(WorkflowError::StepNotReady(0)));
        engine.set_ready(0, true).await.unwrap();
        assert_eq!(engine.advance().await.unwrap(), AdvanceOutcome::Advanced(1));
    }

    #[tokio::test]
    async fn test_validation_blocks_advance() {
        let engine = WorkflowEngine::<Ctx>::default();
        let validator = |ctx: &Ctx| {
            let mut errors = ValidationErrors::new();
            errors.require_text("name", &ctx.name, "Name is required");
            errors.into_result()
        };
        let def = WorkflowDefinition::new("Validate")
            .with_step(Step::new("name", "name-form").with_validator(Arc::new(validator)))
            .with_step(Step::new("end", "end-form").last_step());
        engine.start_workflow(def).await.unwrap();

        match engine.advance().await {
            Err(WorkflowError::Validation(errors)) => {
                assert_eq!(errors.field("name"), Some("Name is required"));
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
        assert_eq!(engine.current_step().await.unwrap().index, 0);

        engine
            .update_context(|ctx: &mut Ctx| ctx.name = "my-app".to_string())
            .await
            .unwrap();
        assert_eq!(engine.advance().await.unwrap(), AdvanceOutcome::Advanced(1));
    }

    #[tokio::test]
    async fn test_failure_keeps_step_and_records_error() {
        let engine = WorkflowEngine::<Ctx>::default();
        let failing = step_fn(|ctx: &mut Ctx| {
            Box::pin(async move {
                ctx.visits += 1;
                StepOutcome::failure("backend unavailable")
            })
        });
        let def = WorkflowDefinition::new("Fail")
            .with_step(Step::new("one", "one-form").with_on_next(failing))
            .with_step(Step::new("end", "end-form").last_step());
        engine.start_workflow(def).await.unwrap();

        let outcome = engine.advance().await.unwrap();
        assert_eq!(outcome, AdvanceOutcome::Failed("backend unavailable".to_string()));
        assert_eq!(engine.current_step().await.unwrap().index, 0);
        assert_eq!(engine.last_error().await.as_deref(), Some("backend unavailable"));
        // Handler side effects survive the failure
        assert_eq!(engine.context().await.visits, 1);
    }

    #[tokio::test]
    async fn test_back_and_jump_gated_by_definition() {
        let engine = WorkflowEngine::<Ctx>::default();
        engine.start_workflow(definition()).await.unwrap();
        engine.advance().await.unwrap();

        assert!(matches!(engine.back().await, Err(WorkflowError::InvalidTransition(_))));
        assert!(matches!(engine.jump_to(0).await, Err(WorkflowError::InvalidTransition(_))));

        engine
            .start_workflow(definition().with_allow_back(true).with_allow_jump(true))
            .await
            .unwrap();
        engine.advance().await.unwrap();
        engine.advance().await.unwrap();

        assert_eq!(engine.back().await.unwrap(), 1);
        engine.jump_to(0).await.unwrap();
        assert_eq!(engine.current_step().await.unwrap().index, 0);
        assert!(engine.jump_to(2).await.is_err());
    }

    #[tokio::test]
    async fn test_update_context_requires_running() {
        let engine = WorkflowEngine::<Ctx>::default();
        let result = engine.update_context(|ctx: &mut Ctx| ctx.visits = 1).await;
        assert_eq!(result, Err(WorkflowError::NotRunning));
    }

    #[tokio::test]
    async fn test_update_context_for_drops_edits_of_old_runs() {
        let engine = WorkflowEngine::<Ctx>::default();
        engine.start_workflow(definition()).await.unwrap();
        let old_run = engine.run_id().await;

        assert!(engine
            .update_context_for(&old_run, |ctx: &mut Ctx| ctx.visits = 7)
            .await
            .unwrap());
        assert_eq!(engine.context().await.visits, 7);

        engine.stop_workflow().await.unwrap();
        engine.start_workflow(definition()).await.unwrap();

        assert!(!engine
            .update_context_for(&old_run, |ctx: &mut Ctx| ctx.visits = 9)
            .await
            .unwrap());
        assert_eq!(engine.context().await.visits, 0);
    }

    #[tokio::test]
    async fn test_definition_metadata() {
        let engine = WorkflowEngine::<Ctx>::default();
        engine
            .start_workflow(definition().with_cancel_label("Abort"))
            .await
            .unwrap();
        assert_eq!(engine.title().await, "Test");
        assert_eq!(engine.cancel_label().await, "Abort");
        assert_eq!(engine.steps().await.len(), 3);
        assert!(!engine.is_busy().await);
    }
}
