//! In-memory source-control service.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use wizflow_pipeline::model::VcsHeaders;
use wizflow_pipeline::remote::{OAuthFlow, RemoteError, RemoteResult, RepoPage, SourceControlApi};

/// A call received by [`InMemorySourceControl`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceControlCall {
    /// `list_repos` with the headers it was given
    ListRepos(VcsHeaders),
    /// `next_repos`
    NextRepos,
    /// `filter_repos` with the term
    FilterRepos(String),
    /// `list_branches` for a repository
    ListBranches(String),
}

#[derive(Default)]
struct State {
    pages: Vec<RepoPage>,
    next_page: usize,
    filter_results: HashMap<String, RepoPage>,
    branches: HashMap<String, Vec<String>>,
    failure: Option<RemoteError>,
    calls: Vec<SourceControlCall>,
}

/// Thread-safe source-control fake serving pre-seeded pages.
#[derive(Clone, Default)]
pub struct InMemorySourceControl {
    state: Arc<RwLock<State>>,
}

impl fmt::Debug for InMemorySourceControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemorySourceControl")
            .field("pages", &state.pages.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl InMemorySourceControl {
    /// Creates an empty fake.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `pages` in order: the first from `list_repos`, the rest from
    /// `next_repos`.
    pub fn with_pages(self, pages: Vec<RepoPage>) -> Self {
        self.state.write().pages = pages;
        self
    }

    /// Result returned when filtering by `term`.
    pub fn with_filter_result(self, term: &str, page: RepoPage) -> Self {
        self.state.write().filter_results.insert(term.to_string(), page);
        self
    }

    /// Branches of `full_name`.
    pub fn with_branches(self, full_name: &str, branches: &[&str]) -> Self {
        self.state.write().branches.insert(
            full_name.to_string(),
            branches.iter().map(|b| b.to_string()).collect(),
        );
        self
    }

    /// Makes every call fail with `error`.
    pub fn fail_with(&self, error: RemoteError) {
        self.state.write().failure = Some(error);
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<SourceControlCall> {
        self.state.read().calls.clone()
    }

    /// Terms passed to `filter_repos`, in order.
    pub fn filter_terms(&self) -> Vec<String> {
        self.state
            .read()
            .calls
            .iter()
            .filter_map(|c| match c {
                SourceControlCall::FilterRepos(term) => Some(term.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SourceControlCall) -> RemoteResult<()> {
        let mut state = self.state.write();
        state.calls.push(call);
        match &state.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SourceControlApi for InMemorySourceControl {
    async fn list_repos(&self, headers: &VcsHeaders) -> RemoteResult<RepoPage> {
        self.record(SourceControlCall::ListRepos(headers.clone()))?;
        let mut state = self.state.write();
        state.next_page = 1;
        Ok(state.pages.first().cloned().unwrap_or_default())
    }

    async fn next_repos(&self, _headers: &VcsHeaders) -> RemoteResult<RepoPage> {
        self.record(SourceControlCall::NextRepos)?;
        let mut state = self.state.write();
        let page = state.pages.get(state.next_page).cloned().unwrap_or_default();
        state.next_page += 1;
        Ok(page)
    }

    async fn filter_repos(&self, term: &str, _headers: &VcsHeaders) -> RemoteResult<Option<RepoPage>> {
        self.record(SourceControlCall::FilterRepos(term.to_string()))?;
        Ok(self.state.read().filter_results.get(term).cloned())
    }

    async fn list_branches(&self, full_name: &str, _headers: &VcsHeaders) -> RemoteResult<Vec<String>> {
        self.record(SourceControlCall::ListBranches(full_name.to_string()))?;
        Ok(self
            .state
            .read()
            .branches
            .get(full_name)
            .cloned()
            .unwrap_or_default())
    }
}

/// OAuth fake recording the providers it was started for.
#[derive(Clone, Default, Debug)]
pub struct RecordingOAuth {
    started: Arc<RwLock<Vec<String>>>,
    failure: Arc<RwLock<Option<RemoteError>>>,
}

impl RecordingOAuth {
    /// Creates a fake that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the handshake fail with `error`.
    pub fn fail_with(&self, error: RemoteError) {
        *self.failure.write() = Some(error);
    }

    /// Browse URLs the handshake was started for.
    pub fn started(&self) -> Vec<String> {
        self.started.read().clone()
    }
}

#[async_trait]
impl OAuthFlow for RecordingOAuth {
    async fn start(&self, browse_url: &str) -> RemoteResult<()> {
        self.started.write().push(browse_url.to_string());
        match self.failure.read().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_generators::repo_page;

    #[tokio::test]
    async fn test_pages_served_in_order() {
        let fake = InMemorySourceControl::new()
            .with_pages(vec![repo_page(&["org/a"], true), repo_page(&["org/b"], false)]);
        let headers = VcsHeaders::new();

        assert_eq!(fake.list_repos(&headers).await.unwrap().repos[0].full_name, "org/a");
        assert_eq!(fake.next_repos(&headers).await.unwrap().repos[0].full_name, "org/b");
        assert!(fake.next_repos(&headers).await.unwrap().repos.is_empty());
        assert_eq!(fake.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_returned() {
        let fake = InMemorySourceControl::new();
        fake.fail_with(RemoteError::Unavailable("GitHub".to_string()));

        assert!(fake.filter_repos("foo", &VcsHeaders::new()).await.is_err());
        assert_eq!(fake.filter_terms(), vec!["foo".to_string()]);
    }
}
