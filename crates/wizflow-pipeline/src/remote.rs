//! Remote collaborators of the pipeline wizard
//!
//! The source-control service, the OAuth handshake and the pipeline backend
//! are reached through these traits. Every call returns a future that either
//! yields a value or fails with a [`RemoteError`] carrying a message that can
//! be shown to the user.

use crate::model::{
    BuildContainer, DeploymentTarget, HceInstance, ImageRegistry, NewDeploymentTarget,
    NewProject, NotificationTarget, NotificationTargetType, Project, Repository, VcsHeaders,
    VcsSource,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a remote call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The service answered with an error status
    #[error("Request failed with status {status}: {message}")]
    Request {
        /// HTTP status code
        status: u16,
        /// Message from the error payload
        message: String,
    },

    /// The service could not be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The response could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Message suitable for display on the failing step
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::Request { message, .. } => message.clone(),
            RemoteError::Unavailable(service) => {
                format!("{} is currently unavailable. Please try again later.", service)
            }
            RemoteError::Decode(_) => "The server returned an unexpected response.".to_string(),
        }
    }
}

/// Result of a remote call
pub type RemoteResult<T> = Result<T, RemoteError>;

/// One page of repositories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoPage {
    /// Repositories on this page
    pub repos: Vec<Repository>,
    /// Whether a next page exists
    pub has_more: bool,
}

/// Source-control service (GitHub and friends) reached through the backend
#[async_trait]
pub trait SourceControlApi: Send + Sync {
    /// First page of the user's repositories
    async fn list_repos(&self, headers: &VcsHeaders) -> RemoteResult<RepoPage>;

    /// Page following the last one returned
    async fn next_repos(&self, headers: &VcsHeaders) -> RemoteResult<RepoPage>;

    /// Repositories matching `term`; `None` when the term was already served
    async fn filter_repos(&self, term: &str, headers: &VcsHeaders) -> RemoteResult<Option<RepoPage>>;

    /// Branch names of a repository
    async fn list_branches(&self, full_name: &str, headers: &VcsHeaders) -> RemoteResult<Vec<String>>;
}

/// OAuth handshake with a source-control provider
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    /// Run the handshake against the provider at `browse_url`
    async fn start(&self, browse_url: &str) -> RemoteResult<()>;
}

/// Pipeline backend
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Backend instances the user has registered
    async fn list_hce_instances(&self) -> RemoteResult<Vec<HceInstance>>;

    /// VCS instances known to a backend
    async fn list_vcs_instances(&self, hce_guid: &str) -> RemoteResult<Vec<VcsSource>>;

    /// Existing projects
    async fn list_projects(&self, hce_guid: &str) -> RemoteResult<Vec<Project>>;

    /// Build containers
    async fn list_build_containers(&self, hce_guid: &str) -> RemoteResult<Vec<BuildContainer>>;

    /// Image registries
    async fn list_image_registries(&self, hce_guid: &str) -> RemoteResult<Vec<ImageRegistry>>;

    /// Existing deployment targets
    async fn list_deployment_targets(&self, hce_guid: &str) -> RemoteResult<Vec<DeploymentTarget>>;

    /// Create a deployment target
    async fn create_deployment_target(
        &self,
        hce_guid: &str,
        target: NewDeploymentTarget,
    ) -> RemoteResult<DeploymentTarget>;

    /// Replace the credentials of a deployment target
    async fn update_deployment_target(
        &self,
        hce_guid: &str,
        target_id: i64,
        target: DeploymentTarget,
    ) -> RemoteResult<()>;

    /// Create a project
    async fn create_project(&self, hce_guid: &str, project: NewProject) -> RemoteResult<Project>;

    /// Bind a project to a Cloud Foundry application
    async fn create_cf_binding(&self, hce_guid: &str, project_id: i64, app_guid: &str) -> RemoteResult<()>;

    /// Notification target types
    async fn list_notification_target_types(&self, hce_guid: &str) -> RemoteResult<Vec<NotificationTargetType>>;

    /// Notification targets attached to a project
    async fn get_notification_targets(
        &self,
        hce_guid: &str,
        project_id: i64,
    ) -> RemoteResult<Vec<NotificationTarget>>;
}
