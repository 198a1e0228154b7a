//!
//! Wizflow Pipeline - wizards built on the wizflow engine
//!
//! The add-pipeline wizard connects a source repository to a Cloud Foundry
//! application through a pipeline backend. The autoscaler editor adjusts the
//! instance limits of an application's scaling policy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Collected input and lookup lists
pub mod model;

/// Remote collaborators
pub mod remote;

/// Error types
pub mod error;

/// The add-pipeline wizard
pub mod add_pipeline;

/// Debounced repository search
pub mod repo_filter;

/// Autoscaler policy editor
pub mod autoscaler;

pub use add_pipeline::{
    no_backend_definition, AddPipelineWorkflow, PipelineServices, BINDING_FAILED_MESSAGE,
    PROJECT_FAILED_MESSAGE,
};
pub use autoscaler::{
    AutoscalerContext, AutoscalerPolicy, AutoscalerPolicyApi, EditAutoscalerPolicyWorkflow,
    LimitsValidator, PolicyLimits,
};
pub use error::{PipelineError, PipelineResult};
pub use model::{PipelineContext, UserInput};
pub use remote::{OAuthFlow, PipelineApi, RemoteError, RemoteResult, RepoPage, SourceControlApi};
pub use repo_filter::RepoFilter;
