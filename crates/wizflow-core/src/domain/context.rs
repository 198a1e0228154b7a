//! The per-run workflow context
//!
//! One context value holds everything a wizard collects (user input) and
//! the lookup lists it builds up while running (options). The engine owns
//! it for the lifetime of a run.
//!
//! Mutation contract:
//!
//! * Step handlers get a working copy. When a handler resolves and the run is
//!   still active, the copy replaces the shared context.
//! * UI edits go through [`crate::WorkflowEngine::update_context`]. They are
//!   applied immediately; if a handler is suspended at that moment they are
//!   also queued and replayed, in order, on top of the handler's copy when it
//!   is committed.
//! * A copy produced after the run was cancelled or restarted is dropped.

use std::sync::Arc;

/// Marker for types usable as a workflow context
pub trait WorkflowContext: Default + Clone + Send + Sync + 'static {}

impl<T> WorkflowContext for T where T: Default + Clone + Send + Sync + 'static {}

/// A replayable edit of the shared context
pub type ContextEdit<C> = Arc<dyn Fn(&mut C) + Send + Sync>;

/// Apply `committed` as the new context and replay `edits` on top of it
pub fn rebase<C>(committed: C, edits: &[ContextEdit<C>]) -> C {
    let mut ctx = committed;
    for edit in edits {
        edit(&mut ctx);
    }
    ctx
}
