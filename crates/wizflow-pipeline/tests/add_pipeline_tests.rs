use pretty_assertions::assert_eq;
use std::sync::Arc;
use wizflow_core::{AdvanceOutcome, WorkflowError, WorkflowStatus};
use wizflow_pipeline::model::{BranchOption, UserInput};
use wizflow_pipeline::{
    AddPipelineWorkflow, PipelineContext, PipelineError, PipelineServices, BINDING_FAILED_MESSAGE,
    PROJECT_FAILED_MESSAGE,
};
use wizflow_test_utils::assertions::{assert_on_step, assert_step_titles};
use wizflow_test_utils::data_generators::*;
use wizflow_test_utils::mockall::predicate::eq;
use wizflow_test_utils::mocks::{create_mock_oauth_flow, create_mock_source_control_api, MockPipelineApi};
use wizflow_test_utils::{
    InMemoryPipelineApi, InMemorySourceControl, PipelineHarness, PipelineOp,
};

fn backend() -> InMemoryPipelineApi {
    InMemoryPipelineApi::new()
        .with_hce_instances(vec![hce_instance(1), hce_instance(2)])
        .with_vcs_instances(vec![github_source(), unsupported_source(), gitlab_source()])
        .with_build_containers(vec![build_container()])
        .with_image_registries(vec![image_registry()])
        .with_projects(vec![project(1, "org/app", "main")])
        .with_notification_target_types(vec![slack_type()])
}

fn source_control() -> InMemorySourceControl {
    InMemorySourceControl::new()
        .with_pages(vec![
            repo_page(&["org/app", "org/lib"], true),
            repo_page(&["org/docs"], false),
        ])
        .with_branches("org/app", &["main", "dev"])
}

fn harness() -> PipelineHarness {
    PipelineHarness::builder()
        .with_pipelines(backend())
        .with_source_control(source_control())
        .build()
}

async fn select_source(harness: &PipelineHarness, source: wizflow_pipeline::model::VcsSource) {
    harness
        .engine
        .update_context(move |ctx| ctx.user_input.source = Some(source.clone()))
        .await
        .unwrap();
}

async fn select_repo(harness: &PipelineHarness, full_name: &str) {
    let repo = repository(full_name);
    harness
        .engine
        .update_context(move |ctx| ctx.user_input.repo = Some(repo.clone()))
        .await
        .unwrap();
}

/// Fill the details form, keeping what the earlier steps collected
async fn fill_details(harness: &PipelineHarness, details: UserInput) {
    harness
        .engine
        .update_context(move |ctx| {
            let input = &mut ctx.user_input;
            *input = UserInput {
                hce_instance: input.hce_instance.take(),
                source: input.source.take(),
                repo: input.repo.take(),
                project_id: input.project_id,
                ..details.clone()
            };
        })
        .await
        .unwrap();
}

/// Start and walk up to the pipeline details form
async fn reach_details(harness: &PipelineHarness) {
    harness.workflow.start().await.unwrap();
    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(1));
    select_repo(harness, "org/app").await;
    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(2));
    fill_details(harness, details_input("org/app", "dev")).await;
}

#[tokio::test]
async fn test_start_prefetches_backends_and_sources() {
    let harness = harness();
    harness.workflow.start().await.unwrap();

    let ctx = harness.engine.context().await;
    assert_eq!(ctx.options.hce_instances.len(), 2);
    assert_eq!(ctx.user_input.hce_instance, Some(hce_instance(1)));

    let labels: Vec<_> = ctx.options.sources.iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["GitHub", "GitLab"]);
    assert_eq!(ctx.user_input.source, Some(github_source()));

    assert_eq!(harness.engine.title().await, "Add Pipeline");
    assert_eq!(harness.engine.cancel_label().await, "Cancel");
    assert_on_step(&harness.engine, "Select Source").await.unwrap();
    assert!(harness.engine.back().await.is_err());
}

#[tokio::test]
async fn test_no_backend_reduces_to_notice() {
    let harness = PipelineHarness::builder().build();
    harness.workflow.start().await.unwrap();

    assert_step_titles(&harness.engine, &["No pipeline backend"]).await.unwrap();
    let step = harness.engine.current_step().await.unwrap();
    assert!(step.is_last_step);
    assert_eq!(harness.events.count("workflow.redefined"), 1);

    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Finished);
}

#[tokio::test]
async fn test_backend_failure_leaves_lists_empty() {
    let pipelines = backend();
    pipelines.fail(PipelineOp::ListHceInstances);
    let harness = PipelineHarness::builder().with_pipelines(pipelines).build();

    harness.workflow.start().await.unwrap();

    let ctx = harness.engine.context().await;
    assert!(ctx.options.hce_instances.is_empty());
    assert!(ctx.options.sources.is_empty());
    assert_step_titles(&harness.engine, &["Select Source"]).await.unwrap();
}

#[tokio::test]
async fn test_source_step_requires_a_source() {
    let pipelines = backend().with_vcs_instances(vec![unsupported_source()]);
    let harness = PipelineHarness::builder().with_pipelines(pipelines).build();
    harness.workflow.start().await.unwrap();

    let err = harness.engine.advance().await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ref errors) if errors.field("source").is_some()));
    assert_on_step(&harness.engine, "Select Source").await.unwrap();
}

#[tokio::test]
async fn test_github_source_splices_notifications_step() {
    let harness = harness();
    harness.workflow.start().await.unwrap();

    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(1));

    assert_step_titles(
        &harness.engine,
        &[
            "Select Source",
            "Select Repository",
            "Pipeline Details",
            "Notifications",
            "Deploy App",
        ],
    )
    .await
    .unwrap();
    assert_eq!(harness.oauth.started(), vec!["https://github.com".to_string()]);

    let ctx = harness.engine.context().await;
    assert_eq!(ctx.options.repos.len(), 2);
    assert!(ctx.options.has_more_repos);
    assert!(!ctx.options.loading_repos);
}

#[tokio::test]
async fn test_gitlab_source_skips_notifications_and_oauth() {
    let harness = harness();
    harness.workflow.start().await.unwrap();
    select_source(&harness, gitlab_source()).await;

    harness.engine.advance().await.unwrap();

    assert_step_titles(
        &harness.engine,
        &["Select Source", "Select Repository", "Pipeline Details", "Deploy App"],
    )
    .await
    .unwrap();
    assert!(harness.oauth.started().is_empty());
}

#[tokio::test]
async fn test_github_enterprise_gets_notifications_without_oauth() {
    let harness = harness();
    harness.workflow.start().await.unwrap();
    select_source(&harness, github_enterprise_source()).await;

    harness.engine.advance().await.unwrap();

    assert_eq!(harness.step_titles().await.len(), 5);
    assert!(harness.oauth.started().is_empty());
}

#[tokio::test]
async fn test_oauth_failure_keeps_source_step() {
    let harness = harness();
    harness
        .oauth
        .fail_with(wizflow_pipeline::RemoteError::Unavailable("GitHub".to_string()));
    harness.workflow.start().await.unwrap();

    let outcome = harness.engine.advance().await.unwrap();

    assert!(matches!(outcome, AdvanceOutcome::Failed(ref m) if m.starts_with("GitHub is currently unavailable")));
    assert_on_step(&harness.engine, "Select Source").await.unwrap();
    assert_step_titles(&harness.engine, &["Select Source"]).await.unwrap();
}

#[tokio::test]
async fn test_repository_step_marks_used_branches() {
    let harness = harness();
    harness.workflow.start().await.unwrap();
    harness.engine.advance().await.unwrap();
    select_repo(&harness, "org/app").await;

    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(2));

    let ctx = harness.engine.context().await;
    assert_eq!(
        ctx.options.branches,
        vec![
            BranchOption {
                label: "main (used by other project)".to_string(),
                value: "main".to_string(),
                disabled: true,
            },
            BranchOption {
                label: "dev".to_string(),
                value: "dev".to_string(),
                disabled: false,
            },
        ]
    );
    assert_eq!(ctx.options.build_containers.len(), 1);
    assert_eq!(ctx.options.image_registries[0].label, "Docker Hub");
}

#[tokio::test]
async fn test_repository_step_tolerates_lookup_failures() {
    let harness = harness();
    harness.pipelines.fail(PipelineOp::ListBuildContainers);
    harness.pipelines.fail(PipelineOp::ListProjects);
    harness.workflow.start().await.unwrap();
    harness.engine.advance().await.unwrap();
    select_repo(&harness, "org/app").await;

    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(2));

    let ctx = harness.engine.context().await;
    assert!(ctx.options.build_containers.is_empty());
    assert!(ctx.options.branches.is_empty());
    assert_eq!(ctx.options.image_registries.len(), 1);
}

#[tokio::test]
async fn test_details_creates_target_project_and_binding() {
    let harness = PipelineHarness::builder()
        .with_pipelines(backend().with_notification_targets(101, vec![notification_target(1)]))
        .with_source_control(source_control())
        .build();
    reach_details(&harness).await;

    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(3));

    let targets = harness.pipelines.created_targets();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].name, "prod - acme - dev - admin");
    assert_eq!(targets[0].url, CF_API_URL);

    let projects = harness.pipelines.created_projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, format!("ci-{}", APP_GUID));
    assert_eq!(projects[0].deployment_target_id, 100);
    assert_eq!(projects[0].branch, "dev");
    assert_eq!(harness.pipelines.bindings(), vec![(101, APP_GUID.to_string())]);

    // Notifications step loaded on entry
    let ctx = harness.engine.context().await;
    assert_eq!(ctx.user_input.project_id, Some(101));
    assert_eq!(ctx.options.notification_target_types, vec![slack_type()]);
    assert_eq!(ctx.user_input.notification_targets, vec![notification_target(1)]);
    assert_on_step(&harness.engine, "Notifications").await.unwrap();

    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(4));
    let deploy = harness.engine.current_step().await.unwrap();
    assert_eq!(deploy.next_label, "Finished code change");
    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Finished);
    assert_eq!(harness.engine.status().await, WorkflowStatus::Finished);
}

#[tokio::test]
async fn test_details_validation_blocks_handler() {
    let harness = harness();
    harness.workflow.start().await.unwrap();
    harness.engine.advance().await.unwrap();
    harness.engine.advance().await.unwrap();

    let err = harness.engine.advance().await.unwrap_err();
    match err {
        WorkflowError::Validation(errors) => {
            assert_eq!(errors.field("repo"), Some("Please select a repository"));
            assert!(errors.field("cluster_username").is_some());
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(harness.pipelines.call_count(PipelineOp::CreateDeploymentTarget), 0);
}

#[tokio::test]
async fn test_project_failure_shows_webhook_message() {
    let harness = harness();
    reach_details(&harness).await;
    harness.pipelines.fail(PipelineOp::CreateProject);

    let outcome = harness.engine.advance().await.unwrap();

    assert_eq!(outcome, AdvanceOutcome::Failed(PROJECT_FAILED_MESSAGE.to_string()));
    assert_eq!(harness.engine.last_error().await.as_deref(), Some(PROJECT_FAILED_MESSAGE));
    assert_on_step(&harness.engine, "Pipeline Details").await.unwrap();
    assert!(harness.pipelines.bindings().is_empty());
}

#[tokio::test]
async fn test_retry_after_binding_failure_reuses_project_and_target() {
    let harness = harness();
    reach_details(&harness).await;
    harness.pipelines.fail(PipelineOp::CreateCfBinding);

    let outcome = harness.engine.advance().await.unwrap();
    assert_eq!(outcome, AdvanceOutcome::Failed(BINDING_FAILED_MESSAGE.to_string()));
    let ctx = harness.engine.context().await;
    assert_eq!(ctx.user_input.project_id, Some(101));
    assert_eq!(
        ctx.options.deployment_target.map(|t| t.deployment_target_id),
        Some(100)
    );

    harness.pipelines.recover(PipelineOp::CreateCfBinding);
    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(3));

    assert_eq!(harness.pipelines.call_count(PipelineOp::CreateProject), 1);
    assert_eq!(harness.pipelines.call_count(PipelineOp::CreateDeploymentTarget), 1);
    assert_eq!(harness.pipelines.call_count(PipelineOp::CreateCfBinding), 2);
    // The existing target got the credentials again on retry
    assert_eq!(harness.pipelines.updated_targets().len(), 1);
    assert_eq!(harness.pipelines.bindings(), vec![(101, APP_GUID.to_string())]);
}

#[tokio::test]
async fn test_existing_target_without_password_is_not_updated() {
    let pipelines = backend().with_deployment_targets(vec![deployment_target(5, "admin")]);
    let harness = PipelineHarness::builder()
        .with_pipelines(pipelines)
        .with_source_control(source_control())
        .build();
    reach_details(&harness).await;
    fill_details(
        &harness,
        UserInput {
            cluster_password: None,
            ..details_input("org/app", "dev")
        },
    )
    .await;

    let matched = harness.workflow.set_cluster_username("admin").await.unwrap();
    assert_eq!(matched.map(|t| t.deployment_target_id), Some(5));

    assert_eq!(harness.engine.advance().await.unwrap(), AdvanceOutcome::Advanced(3));

    assert!(harness.pipelines.updated_targets().is_empty());
    assert!(harness.pipelines.created_targets().is_empty());
    assert_eq!(harness.pipelines.created_projects()[0].deployment_target_id, 5);
}

#[tokio::test]
async fn test_existing_target_with_password_is_updated() {
    let pipelines = backend().with_deployment_targets(vec![deployment_target(5, "admin")]);
    let harness = PipelineHarness::builder()
        .with_pipelines(pipelines)
        .with_source_control(source_control())
        .build();
    reach_details(&harness).await;
    harness.workflow.set_cluster_username("admin").await.unwrap();

    harness.engine.advance().await.unwrap();

    let updates = harness.pipelines.updated_targets();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, 5);
    assert_eq!(updates[0].1.password.as_deref(), Some("s3cret"));
    assert!(harness.pipelines.created_targets().is_empty());
}

#[tokio::test]
async fn test_cluster_username_lookup_fetches_targets_once() {
    let pipelines = backend().with_deployment_targets(vec![
        deployment_target(5, "admin"),
        deployment_target(6, "deployer"),
    ]);
    let harness = PipelineHarness::builder()
        .with_pipelines(pipelines)
        .with_source_control(source_control())
        .build();
    reach_details(&harness).await;

    let first = harness.workflow.set_cluster_username("deployer").await.unwrap();
    let second = harness.workflow.set_cluster_username("nobody").await.unwrap();
    let third = harness.workflow.set_cluster_username("admin").await.unwrap();

    assert_eq!(first.map(|t| t.deployment_target_id), Some(6));
    assert_eq!(second, None);
    assert_eq!(third.map(|t| t.deployment_target_id), Some(5));
    assert_eq!(harness.pipelines.call_count(PipelineOp::ListDeploymentTargets), 1);
}

#[tokio::test]
async fn test_load_more_appends_next_page() {
    let harness = harness();
    harness.workflow.start().await.unwrap();
    harness.engine.advance().await.unwrap();

    harness.workflow.load_more_repos().await.unwrap();

    let ctx = harness.engine.context().await;
    let names: Vec<_> = ctx.options.repos.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, vec!["org/app", "org/lib", "org/docs"]);
    assert!(!ctx.options.has_more_repos);
}

#[tokio::test]
async fn test_cancel_discards_input_and_late_results() {
    let harness = harness();
    reach_details(&harness).await;

    harness.workflow.stop().await.unwrap();

    assert_eq!(harness.engine.status().await, WorkflowStatus::Cancelled);
    assert_eq!(harness.engine.context().await, PipelineContext::default());
    assert!(harness.engine.current_step().await.is_none());
    assert!(matches!(
        harness.workflow.load_more_repos().await,
        Err(PipelineError::Workflow(WorkflowError::NotRunning))
    ));
    assert!(harness.engine.advance().await.is_err());
}

#[tokio::test]
async fn test_restart_begins_with_fresh_context() {
    let harness = harness();
    reach_details(&harness).await;

    harness.workflow.start().await.unwrap();

    let ctx = harness.engine.context().await;
    assert!(ctx.user_input.repo.is_none());
    assert!(ctx.options.repos.is_empty());
    assert_step_titles(&harness.engine, &["Select Source"]).await.unwrap();
    assert_eq!(harness.events.count("workflow.started"), 2);
}

#[tokio::test]
async fn test_mocked_backend_prefetch_calls() {
    let mut pipelines = MockPipelineApi::new();
    pipelines
        .expect_list_hce_instances()
        .times(1)
        .returning(|| Ok(vec![hce_instance(1)]));
    pipelines
        .expect_list_vcs_instances()
        .with(eq("hce-1"))
        .times(1)
        .returning(|_| Ok(vec![gitlab_source()]));

    let engine = Arc::new(wizflow_core::WorkflowEngine::default());
    let workflow = AddPipelineWorkflow::new(
        engine.clone(),
        PipelineServices {
            source_control: Arc::new(create_mock_source_control_api()),
            pipelines: Arc::new(pipelines),
            oauth: Arc::new(create_mock_oauth_flow()),
        },
    );

    workflow.start().await.unwrap();

    assert_eq!(
        engine.with_context(|ctx| ctx.user_input.source.clone()).await,
        Some(gitlab_source())
    );
}
