//! Debounced repository search

use crate::add_pipeline::AddPipelineWorkflow;
use crate::error::PipelineResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use wizflow_core::{DebouncedCallback, Debouncer, EngineConfig, RunId, WorkflowError};

/// Feeds the repository filter box into the wizard.
///
/// Each keystroke stores the term right away; the backend is only asked once
/// the user has stopped typing for the quiet period. A search belongs to the
/// run it was typed in and is dropped if that run is gone when it fires.
pub struct RepoFilter {
    workflow: Arc<AddPipelineWorkflow>,
    debouncer: Debouncer<(RunId, String)>,
}

impl RepoFilter {
    /// Quiet period taken from the engine configuration
    pub fn new(workflow: Arc<AddPipelineWorkflow>, config: &EngineConfig) -> Self {
        Self::with_quiet_period(workflow, config.filter_debounce())
    }

    /// Explicit quiet period
    pub fn with_quiet_period(workflow: Arc<AddPipelineWorkflow>, quiet: Duration) -> Self {
        let target = workflow.clone();
        let callback: DebouncedCallback<(RunId, String)> = Arc::new(move |(run_id, term): (RunId, String)| {
            let workflow = target.clone();
            Box::pin(async move {
                if let Err(e) = workflow.filter_repos_for(&run_id, &term).await {
                    warn!(term = %term, error = %e, "Repository filter failed");
                }
            })
        });

        Self {
            workflow,
            debouncer: Debouncer::new(quiet, callback),
        }
    }

    /// Handle a change of the filter text
    pub async fn on_term_changed(&self, term: impl Into<String>) -> PipelineResult<()> {
        let term = term.into();
        let stored = term.clone();
        let engine = self.workflow.engine();
        let run_id = engine.run_id().await;
        let applied = engine
            .update_context_for(&run_id, move |ctx| ctx.user_input.repo_filter_term = stored.clone())
            .await?;
        if !applied {
            return Err(WorkflowError::NotRunning.into());
        }

        self.debouncer.trigger((run_id, term));
        Ok(())
    }

    /// Whether a search is waiting for the quiet period to end
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Drop a scheduled search, e.g. when the wizard closes
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    /// Run a scheduled search now
    pub async fn flush(&self) {
        self.debouncer.flush().await;
    }
}
