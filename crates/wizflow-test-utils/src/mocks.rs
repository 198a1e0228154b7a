//! Mock implementations of the remote collaborators.
//!
//! Use these when a test needs exact call expectations; the fakes in
//! [`crate::implementations`] are simpler when only the resulting state
//! matters.

use async_trait::async_trait;
use mockall::mock;
use wizflow_pipeline::autoscaler::{AutoscalerPolicy, AutoscalerPolicyApi};
use wizflow_pipeline::model::{
    BuildContainer, DeploymentTarget, HceInstance, ImageRegistry, NewDeploymentTarget,
    NewProject, NotificationTarget, NotificationTargetType, Project, VcsHeaders, VcsSource,
};
use wizflow_pipeline::remote::{OAuthFlow, PipelineApi, RemoteResult, RepoPage, SourceControlApi};

mock! {
    pub SourceControlApi {}

    #[async_trait]
    impl SourceControlApi for SourceControlApi {
        async fn list_repos(&self, headers: &VcsHeaders) -> RemoteResult<RepoPage>;
        async fn next_repos(&self, headers: &VcsHeaders) -> RemoteResult<RepoPage>;
        async fn filter_repos(&self, term: &str, headers: &VcsHeaders) -> RemoteResult<Option<RepoPage>>;
        async fn list_branches(&self, full_name: &str, headers: &VcsHeaders) -> RemoteResult<Vec<String>>;
    }
}

mock! {
    pub OAuthFlow {}

    #[async_trait]
    impl OAuthFlow for OAuthFlow {
        async fn start(&self, browse_url: &str) -> RemoteResult<()>;
    }
}

mock! {
    pub PipelineApi {}

    #[async_trait]
    impl PipelineApi for PipelineApi {
        async fn list_hce_instances(&self) -> RemoteResult<Vec<HceInstance>>;
        async fn list_vcs_instances(&self, hce_guid: &str) -> RemoteResult<Vec<VcsSource>>;
        async fn list_projects(&self, hce_guid: &str) -> RemoteResult<Vec<Project>>;
        async fn list_build_containers(&self, hce_guid: &str) -> RemoteResult<Vec<BuildContainer>>;
        async fn list_image_registries(&self, hce_guid: &str) -> RemoteResult<Vec<ImageRegistry>>;
        async fn list_deployment_targets(&self, hce_guid: &str) -> RemoteResult<Vec<DeploymentTarget>>;
        async fn create_deployment_target(&self, hce_guid: &str, target: NewDeploymentTarget) -> RemoteResult<DeploymentTarget>;
        async fn update_deployment_target(&self, hce_guid: &str, target_id: i64, target: DeploymentTarget) -> RemoteResult<()>;
        async fn create_project(&self, hce_guid: &str, project: NewProject) -> RemoteResult<Project>;
        async fn create_cf_binding(&self, hce_guid: &str, project_id: i64, app_guid: &str) -> RemoteResult<()>;
        async fn list_notification_target_types(&self, hce_guid: &str) -> RemoteResult<Vec<NotificationTargetType>>;
        async fn get_notification_targets(&self, hce_guid: &str, project_id: i64) -> RemoteResult<Vec<NotificationTarget>>;
    }
}

mock! {
    pub AutoscalerPolicyApi {}

    #[async_trait]
    impl AutoscalerPolicyApi for AutoscalerPolicyApi {
        async fn get_policy(&self, app_guid: &str) -> RemoteResult<Option<AutoscalerPolicy>>;
        async fn update_policy(&self, app_guid: &str, policy: AutoscalerPolicy) -> RemoteResult<()>;
    }
}

/// Creates a mock OAuth flow that always succeeds
pub fn create_mock_oauth_flow() -> MockOAuthFlow {
    let mut mock = MockOAuthFlow::new();
    mock.expect_start().returning(|_| Ok(()));
    mock
}

/// Creates a mock source-control API serving a single empty page
pub fn create_mock_source_control_api() -> MockSourceControlApi {
    let mut mock = MockSourceControlApi::new();

    mock.expect_list_repos()
        .returning(|_| Ok(RepoPage::default()));
    mock.expect_next_repos()
        .returning(|_| Ok(RepoPage::default()));
    mock.expect_filter_repos()
        .returning(|_, _| Ok(None));
    mock.expect_list_branches()
        .returning(|_, _| Ok(Vec::new()));

    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use wizflow_pipeline::remote::RemoteError;

    #[tokio::test]
    async fn test_mock_source_control_default_behavior() {
        let mock = create_mock_source_control_api();
        let headers = VcsHeaders::new();

        let page = mock.list_repos(&headers).await.unwrap();
        assert!(page.repos.is_empty());
        assert!(mock.filter_repos("foo", &headers).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_oauth_custom_behavior() {
        let mut mock = MockOAuthFlow::new();
        mock.expect_start()
            .with(eq("https://github.com"))
            .times(1)
            .returning(|_| Err(RemoteError::Unavailable("GitHub".to_string())));

        let result = mock.start("https://github.com").await;
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
    }
}
