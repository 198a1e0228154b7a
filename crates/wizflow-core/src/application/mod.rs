/// Workflow engine service
pub mod engine;

/// Trailing-edge debounce primitive
pub mod debounce;
