use crate::domain::validation::FormValidator;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Result of a step handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The handler completed and the step may be left
    Success,
    /// The handler failed; the message is shown on the step
    Failure(String),
}

impl StepOutcome {
    /// Build a failure with a user-visible message
    pub fn failure(message: impl Into<String>) -> Self {
        StepOutcome::Failure(message.into())
    }

    /// Whether the handler succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }

    /// The failure message, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            StepOutcome::Success => None,
            StepOutcome::Failure(msg) => Some(msg),
        }
    }

    /// Map a result onto an outcome using the error's display text
    pub fn from_result<E: fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => StepOutcome::Success,
            Err(e) => StepOutcome::Failure(e.to_string()),
        }
    }
}

/// Asynchronous `on_next` / `on_enter` handler of a step.
///
/// The handler receives a working copy of the workflow context. The engine
/// commits the copy when the handler resolves, unless the run was cancelled
/// or restarted while it was suspended.
#[async_trait]
pub trait StepHandler<C>: Send + Sync {
    /// Run the handler
    async fn handle(&self, ctx: &mut C) -> StepOutcome;
}

/// Adapter turning a closure into a [`StepHandler`]
pub struct FnStep<F> {
    f: F,
}

#[async_trait]
impl<C, F> StepHandler<C> for FnStep<F>
where
    C: Send,
    F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, StepOutcome> + Send + Sync,
{
    async fn handle(&self, ctx: &mut C) -> StepOutcome {
        (self.f)(ctx).await
    }
}

/// Wrap a closure returning a boxed future as a shareable handler
pub fn step_fn<C, F>(f: F) -> Arc<dyn StepHandler<C>>
where
    C: Send + 'static,
    F: for<'a> Fn(&'a mut C) -> BoxFuture<'a, StepOutcome> + Send + Sync + 'static,
{
    Arc::new(FnStep { f })
}

/// Computes the steps to splice after a static step from the current context
pub trait SubflowProvider<C>: Send + Sync {
    /// Steps that follow the declaring step for this context
    fn subflow(&self, ctx: &C) -> Vec<Step<C>>;
}

impl<C, F> SubflowProvider<C> for F
where
    F: Fn(&C) -> Vec<Step<C>> + Send + Sync,
{
    fn subflow(&self, ctx: &C) -> Vec<Step<C>> {
        self(ctx)
    }
}

/// One page of a wizard
pub struct Step<C> {
    /// Title shown in the step header
    pub title: String,

    /// Template rendered by the UI shell
    pub template_ref: String,

    /// Name of the form the step owns
    pub form_name: String,

    /// Label of the "next" button
    pub next_label: String,

    /// Gate: the step cannot be left while false
    pub ready: bool,

    /// Leaving this step finishes the workflow
    pub is_last_step: bool,

    /// Runs when the user leaves the step
    pub on_next: Option<Arc<dyn StepHandler<C>>>,

    /// Runs before the step becomes visible
    pub on_enter: Option<Arc<dyn StepHandler<C>>>,

    /// Steps spliced after this one once `on_next` succeeds
    pub subflow: Option<Arc<dyn SubflowProvider<C>>>,

    /// Form validation run before `on_next`
    pub validator: Option<Arc<dyn FormValidator<C>>>,
}

impl<C> Step<C> {
    /// Create a ready step with no handlers
    pub fn new(title: impl Into<String>, form_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            template_ref: String::new(),
            form_name: form_name.into(),
            next_label: "Next".to_string(),
            ready: true,
            is_last_step: false,
            on_next: None,
            on_enter: None,
            subflow: None,
            validator: None,
        }
    }

    /// Set the template reference
    pub fn with_template(mut self, template_ref: impl Into<String>) -> Self {
        self.template_ref = template_ref.into();
        self
    }

    /// Set the "next" button label
    pub fn with_next_label(mut self, label: impl Into<String>) -> Self {
        self.next_label = label.into();
        self
    }

    /// Set the ready gate
    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    /// Mark as the final step
    pub fn last_step(mut self) -> Self {
        self.is_last_step = true;
        self
    }

    /// Attach an `on_next` handler
    pub fn with_on_next(mut self, handler: Arc<dyn StepHandler<C>>) -> Self {
        self.on_next = Some(handler);
        self
    }

    /// Attach an `on_enter` handler
    pub fn with_on_enter(mut self, handler: Arc<dyn StepHandler<C>>) -> Self {
        self.on_enter = Some(handler);
        self
    }

    /// Attach a sub-flow provider
    pub fn with_subflow(mut self, provider: Arc<dyn SubflowProvider<C>>) -> Self {
        self.subflow = Some(provider);
        self
    }

    /// Attach a form validator
    pub fn with_validator(mut self, validator: Arc<dyn FormValidator<C>>) -> Self {
        self.validator = Some(validator);
        self
    }
}

// Handlers are shared, so cloning a step never requires `C: Clone`
impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            template_ref: self.template_ref.clone(),
            form_name: self.form_name.clone(),
            next_label: self.next_label.clone(),
            ready: self.ready,
            is_last_step: self.is_last_step,
            on_next: self.on_next.clone(),
            on_enter: self.on_enter.clone(),
            subflow: self.subflow.clone(),
            validator: self.validator.clone(),
        }
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("title", &self.title)
            .field("form_name", &self.form_name)
            .field("ready", &self.ready)
            .field("is_last_step", &self.is_last_step)
            .field("has_on_next", &self.on_next.is_some())
            .field("has_on_enter", &self.on_enter.is_some())
            .field("has_subflow", &self.subflow.is_some())
            .finish()
    }
}

/// Read-only snapshot of a step for the UI shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    /// Position in the current step list
    pub index: usize,
    /// Step title
    pub title: String,
    /// Template reference
    pub template_ref: String,
    /// Form name
    pub form_name: String,
    /// "next" button label
    pub next_label: String,
    /// Ready gate
    pub ready: bool,
    /// Final step flag
    pub is_last_step: bool,
}

impl StepView {
    /// Snapshot `step` at `index`
    pub fn of<C>(index: usize, step: &Step<C>) -> Self {
        Self {
            index,
            title: step.title.clone(),
            template_ref: step.template_ref.clone(),
            form_name: step.form_name.clone(),
            next_label: step.next_label.clone(),
            ready: step.ready,
            is_last_step: step.is_last_step,
        }
    }
}
