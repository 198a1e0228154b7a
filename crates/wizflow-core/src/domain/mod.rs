/// Workflow run aggregate
pub mod run;

/// Domain events
pub mod events;

/// Workflow definition domain models
pub mod definition;

/// Steps and step handlers
pub mod step;

/// Per-run context contract
pub mod context;

/// Sub-flow splicing
pub mod subflow;

/// Form validation
pub mod validation;
