//!
//! Wizflow Core - wizard workflow engine
//!
//! This crate sequences multi-step forms: it gates each transition on the
//! step's ready flag, its form validation and its async `on_next` handler,
//! splices sub-flows chosen from the collected input, and drops the results
//! of handlers that resolve after the run was cancelled or restarted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - definitions, steps, run state machine and events
pub mod domain;

/// Application services - the engine and the debounce primitive
pub mod application;

/// Error types
pub mod error;

/// Engine configuration
pub mod config;

/// Structured logging setup
pub mod logging;

pub use application::debounce::{DebouncedCallback, Debouncer};
pub use application::engine::{AdvanceOutcome, WorkflowEngine};
pub use config::EngineConfig;
pub use domain::context::{ContextEdit, WorkflowContext};
pub use domain::definition::WorkflowDefinition;
pub use domain::events::{LoggingEventHandler, WorkflowEvent, WorkflowEventHandler};
pub use domain::run::{RunId, WorkflowRun, WorkflowStatus};
pub use domain::step::{step_fn, Step, StepHandler, StepOutcome, StepView, SubflowProvider};
pub use domain::validation::{FieldError, FormValidator, ValidationErrors};
pub use error::WorkflowError;
