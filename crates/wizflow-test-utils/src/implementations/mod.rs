//! In-memory fakes of the remote collaborators

mod gate;
mod in_memory_autoscaler;
mod in_memory_pipeline_api;
mod in_memory_source_control;

pub use gate::Gate;
pub use in_memory_autoscaler::InMemoryAutoscalerPolicyApi;
pub use in_memory_pipeline_api::{InMemoryPipelineApi, PipelineOp};
pub use in_memory_source_control::{InMemorySourceControl, RecordingOAuth, SourceControlCall};
