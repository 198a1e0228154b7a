use crate::domain::step::Step;
use crate::WorkflowError;
use std::collections::HashSet;
use std::fmt;

/// An ordered wizard definition
pub struct WorkflowDefinition<C> {
    /// Title of the wizard
    pub title: String,

    /// Whether the user may jump to an already visited step
    pub allow_jump: bool,

    /// Whether the user may step back
    pub allow_back: bool,

    /// Label of the cancel button
    pub cancel_label: String,

    /// The static steps of this wizard
    pub steps: Vec<Step<C>>,
}

impl<C> WorkflowDefinition<C> {
    /// Create an empty definition with linear, forward-only navigation
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            allow_jump: false,
            allow_back: false,
            cancel_label: "Cancel".to_string(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn with_step(mut self, step: Step<C>) -> Self {
        self.steps.push(step);
        self
    }

    /// Allow or forbid stepping back
    pub fn with_allow_back(mut self, allow: bool) -> Self {
        self.allow_back = allow;
        self
    }

    /// Allow or forbid jumping to visited steps
    pub fn with_allow_jump(mut self, allow: bool) -> Self {
        self.allow_jump = allow;
        self
    }

    /// Set the cancel button label
    pub fn with_cancel_label(mut self, label: impl Into<String>) -> Self {
        self.cancel_label = label.into();
        self
    }

    /// Number of steps the definition was built with.
    ///
    /// Dynamic sub-flows are always spliced after this many steps.
    pub fn static_step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validate the workflow definition
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.steps.is_empty() {
            return Err(WorkflowError::InvalidDefinition(
                "Workflow must have at least one step".to_string(),
            ));
        }

        let mut forms = HashSet::new();
        for step in &self.steps {
            if !forms.insert(step.form_name.as_str()) {
                return Err(WorkflowError::InvalidDefinition(format!(
                    "Duplicate form name: {}",
                    step.form_name
                )));
            }
        }

        let last = self.steps.len() - 1;
        if let Some(pos) = self.steps.iter().position(|s| s.is_last_step) {
            if pos != last {
                return Err(WorkflowError::InvalidDefinition(format!(
                    "Step '{}' is marked as last but is followed by other steps",
                    self.steps[pos].title
                )));
            }
        }

        Ok(())
    }
}

impl<C> Clone for WorkflowDefinition<C> {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            allow_jump: self.allow_jump,
            allow_back: self.allow_back,
            cancel_label: self.cancel_label.clone(),
            steps: self.steps.clone(),
        }
    }
}

impl<C> fmt::Debug for WorkflowDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("title", &self.title)
            .field("allow_jump", &self.allow_jump)
            .field("allow_back", &self.allow_back)
            .field("cancel_label", &self.cancel_label)
            .field("steps", &self.steps)
            .finish()
    }
}
