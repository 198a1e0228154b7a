//! Testing utilities for the wizflow crates.
//!
//! Mocks for exact call expectations, in-memory fakes of the remote
//! collaborators, harnesses wiring the wizards to those fakes, fixtures and
//! assertion helpers.

pub mod assertions;
pub mod builders;
pub mod data_generators;
pub mod implementations;
pub mod mocks;

/// Re-export commonly used types for convenience
pub use mockall;

pub use builders::{AutoscalerHarness, PipelineHarness, RecordingEventHandler};
pub use implementations::{
    Gate, InMemoryAutoscalerPolicyApi, InMemoryPipelineApi, InMemorySourceControl, PipelineOp,
    RecordingOAuth,
};
