//! The add-pipeline wizard
//!
//! One static step selects the VCS source. Leaving it splices the rest of
//! the wizard, chosen from the source type: GitHub flavours get a
//! notifications step, other VCS types go straight from the pipeline details
//! to the deploy step.

use crate::error::{outcome, PipelineError, PipelineResult};
use crate::model::{
    BranchOption, DeploymentTarget, NewDeploymentTarget, NewProject, Options, PipelineContext,
    SelectOption, UserInput, VcsHeaders, VcsSource, VcsType,
};
use crate::remote::{OAuthFlow, PipelineApi, RemoteResult, RepoPage, SourceControlApi};
use async_trait::async_trait;
use futures::future::join;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wizflow_core::{
    RunId, Step, StepHandler, StepOutcome, SubflowProvider, ValidationErrors, WorkflowDefinition,
    WorkflowEngine, WorkflowError,
};

/// Shown when the backend refuses to create the project
pub const PROJECT_FAILED_MESSAGE: &str = "There was a problem creating the pipeline. Please ensure the webhook limit has not been reached on your repository.";

/// Shown when the project cannot be bound to the application
pub const BINDING_FAILED_MESSAGE: &str =
    "There was a problem creating the pipeline binding. Please check your username and password.";

const USED_BRANCH_SUFFIX: &str = " (used by other project)";

const TEMPLATE_DIR: &str = "add-pipeline";

fn template(name: &str) -> String {
    format!("{}/{}.html", TEMPLATE_DIR, name)
}

/// Remote clients used by the wizard
#[derive(Clone)]
pub struct PipelineServices {
    /// Repositories and branches
    pub source_control: Arc<dyn SourceControlApi>,
    /// Pipeline backend
    pub pipelines: Arc<dyn PipelineApi>,
    /// OAuth handshake for github.com
    pub oauth: Arc<dyn OAuthFlow>,
}

fn hce_guid(input: &UserInput) -> PipelineResult<String> {
    input
        .hce_guid()
        .map(str::to_string)
        .ok_or(PipelineError::MissingInput("pipeline backend"))
}

fn apply_repo_page(options: &mut Options, page: &RepoPage) {
    options.has_more_repos = page.has_more;
    options.repos.extend(page.repos.iter().cloned());
}

fn branch_option(name: String, used: &[String]) -> BranchOption {
    let disabled = used.contains(&name);
    let label = if disabled {
        format!("{}{}", name, USED_BRANCH_SUFFIX)
    } else {
        name.clone()
    };
    BranchOption {
        label,
        value: name,
        disabled,
    }
}

async fn fetch_repos(services: &PipelineServices, ctx: &mut PipelineContext) -> PipelineResult<()> {
    let headers = ctx.user_input.vcs_headers();

    ctx.options.loading_repos = true;
    let result = services.source_control.list_repos(&headers).await;
    ctx.options.loading_repos = false;

    let page = result?;
    debug!(count = page.repos.len(), has_more = page.has_more, "Repositories fetched");
    apply_repo_page(&mut ctx.options, &page);
    Ok(())
}

/// Build containers and image registries; failures leave the lists as they are
async fn fetch_pipeline_details_data(services: &PipelineServices, ctx: &mut PipelineContext) {
    let Some(hce) = ctx.user_input.hce_guid().map(str::to_string) else {
        warn!("No pipeline backend selected, skipping build container lookup");
        return;
    };

    let (containers, registries) = join(
        services.pipelines.list_build_containers(&hce),
        services.pipelines.list_image_registries(&hce),
    )
    .await;

    match containers {
        Ok(containers) => ctx
            .options
            .build_containers
            .extend(containers.into_iter().map(|c| SelectOption {
                label: c.build_container_label.clone(),
                value: c,
            })),
        Err(e) => warn!(error = %e, "Could not list build containers"),
    }

    match registries {
        Ok(registries) => ctx
            .options
            .image_registries
            .extend(registries.into_iter().map(|r| SelectOption {
                label: r.registry_label.clone(),
                value: r,
            })),
        Err(e) => warn!(error = %e, "Could not list image registries"),
    }
}

async fn fetch_branches(services: &PipelineServices, ctx: &mut PipelineContext) -> PipelineResult<()> {
    let Some(repo) = ctx.user_input.repo.clone() else {
        return Ok(());
    };
    let hce = hce_guid(&ctx.user_input)?;

    let used: Vec<String> = services
        .pipelines
        .list_projects(&hce)
        .await?
        .into_iter()
        .filter(|p| p.repo.full_name == repo.full_name)
        .map(|p| p.repo.branch)
        .collect();

    let headers = ctx.user_input.vcs_headers();
    let branches = services
        .source_control
        .list_branches(&repo.full_name, &headers)
        .await?;

    ctx.options
        .branches
        .extend(branches.into_iter().map(|name| branch_option(name, &used)));
    Ok(())
}

/// Push new credentials to an existing target.
///
/// Without a password there is nothing to update and the backend is not
/// called.
async fn update_deployment_target(
    services: &PipelineServices,
    hce: &str,
    input: &UserInput,
    target: &mut DeploymentTarget,
) -> PipelineResult<()> {
    if !input.has_password() {
        debug!(
            target_id = target.deployment_target_id,
            "No password supplied, leaving deployment target unchanged"
        );
        return Ok(());
    }

    target.user_name = input.cluster_username.clone();
    target.password = input.cluster_password.clone();
    services
        .pipelines
        .update_deployment_target(hce, target.deployment_target_id, target.clone())
        .await?;
    Ok(())
}

fn new_deployment_target(input: &UserInput) -> PipelineResult<NewDeploymentTarget> {
    let service = input
        .service_instance
        .as_ref()
        .ok_or(PipelineError::MissingInput("Cloud Foundry endpoint"))?;
    let organization = input
        .organization
        .as_ref()
        .ok_or(PipelineError::MissingInput("organization"))?;
    let space = input
        .space
        .as_ref()
        .ok_or(PipelineError::MissingInput("space"))?;

    Ok(NewDeploymentTarget {
        name: input.deployment_target_name().unwrap_or_default(),
        url: service.api_endpoint.url(),
        user_name: input.cluster_username.clone(),
        password: input.cluster_password.clone().unwrap_or_default(),
        organization: organization.name.clone(),
        space: space.name.clone(),
    })
}

fn new_project(input: &UserInput, deployment_target_id: i64) -> PipelineResult<NewProject> {
    let source = input
        .source
        .clone()
        .ok_or(PipelineError::MissingInput("source"))?;
    let build_container = input
        .build_container
        .as_ref()
        .ok_or(PipelineError::MissingInput("build container"))?;
    let repo = input
        .repo
        .clone()
        .ok_or(PipelineError::MissingInput("repository"))?;
    let branch = input
        .branch
        .clone()
        .ok_or(PipelineError::MissingInput("branch"))?;
    let name = input
        .project_name()
        .ok_or(PipelineError::MissingInput("application"))?;

    Ok(NewProject {
        name,
        repo_url: source.browse_url.clone(),
        source,
        deployment_target_id,
        build_container_id: build_container.build_container_id,
        repo,
        branch,
    })
}

/// Create the project (once per run) and bind it to the application
async fn create_pipeline(
    services: &PipelineServices,
    hce: &str,
    ctx: &mut PipelineContext,
    deployment_target_id: i64,
) -> PipelineResult<()> {
    match ctx.user_input.project_id {
        Some(project_id) => debug!(project_id, "Project already created"),
        None => {
            let project = new_project(&ctx.user_input, deployment_target_id)?;
            match services.pipelines.create_project(hce, project).await {
                Ok(created) => {
                    info!(project_id = created.id, name = %created.name, "Project created");
                    ctx.user_input.project_id = Some(created.id);
                }
                Err(e) => {
                    warn!(error = %e, "Could not create project");
                    return Err(PipelineError::StepFailed(PROJECT_FAILED_MESSAGE.to_string()));
                }
            }
        }
    }

    let project_id = ctx
        .user_input
        .project_id
        .ok_or(PipelineError::MissingInput("project"))?;
    let app_guid = ctx
        .user_input
        .application
        .as_ref()
        .map(|a| a.guid.clone())
        .ok_or(PipelineError::MissingInput("application"))?;

    services
        .pipelines
        .create_cf_binding(hce, project_id, &app_guid)
        .await
        .map_err(|e| {
            warn!(error = %e, project_id, "Could not bind project");
            PipelineError::StepFailed(BINDING_FAILED_MESSAGE.to_string())
        })
}

struct SelectSourceNext {
    services: PipelineServices,
}

impl SelectSourceNext {
    async fn run(&self, ctx: &mut PipelineContext) -> PipelineResult<()> {
        let source = ctx
            .user_input
            .source
            .clone()
            .ok_or(PipelineError::MissingInput("source"))?;

        if source.vcs_type.requires_oauth() {
            debug!(browse_url = %source.browse_url, "Starting OAuth handshake");
            self.services.oauth.start(&source.browse_url).await?;
        }

        fetch_repos(&self.services, ctx).await
    }
}

#[async_trait]
impl StepHandler<PipelineContext> for SelectSourceNext {
    async fn handle(&self, ctx: &mut PipelineContext) -> StepOutcome {
        outcome(self.run(ctx).await)
    }
}

struct SelectRepositoryNext {
    services: PipelineServices,
}

#[async_trait]
impl StepHandler<PipelineContext> for SelectRepositoryNext {
    async fn handle(&self, ctx: &mut PipelineContext) -> StepOutcome {
        fetch_pipeline_details_data(&self.services, ctx).await;
        if let Err(e) = fetch_branches(&self.services, ctx).await {
            warn!(error = %e, "Could not list branches");
        }
        StepOutcome::Success
    }
}

struct PipelineDetailsNext {
    services: PipelineServices,
}

impl PipelineDetailsNext {
    async fn run(&self, ctx: &mut PipelineContext) -> PipelineResult<()> {
        let hce = hce_guid(&ctx.user_input)?;

        let target_id = match ctx.options.deployment_target.clone() {
            Some(mut target) => {
                update_deployment_target(&self.services, &hce, &ctx.user_input, &mut target).await?;
                let id = target.deployment_target_id;
                ctx.options.deployment_target = Some(target);
                id
            }
            None => {
                let request = new_deployment_target(&ctx.user_input)?;
                let created = self
                    .services
                    .pipelines
                    .create_deployment_target(&hce, request)
                    .await?;
                info!(target_id = created.deployment_target_id, name = %created.name, "Deployment target created");
                let id = created.deployment_target_id;
                // A retry after a failed binding reuses this target
                ctx.options.deployment_target = Some(created);
                id
            }
        };

        create_pipeline(&self.services, &hce, ctx, target_id).await
    }
}

#[async_trait]
impl StepHandler<PipelineContext> for PipelineDetailsNext {
    async fn handle(&self, ctx: &mut PipelineContext) -> StepOutcome {
        outcome(self.run(ctx).await)
    }
}

struct NotificationsEnter {
    services: PipelineServices,
}

impl NotificationsEnter {
    async fn run(&self, ctx: &mut PipelineContext) -> PipelineResult<()> {
        let hce = hce_guid(&ctx.user_input)?;

        ctx.options.notification_target_types = self
            .services
            .pipelines
            .list_notification_target_types(&hce)
            .await?;

        // Targets the backend attached on its own, e.g. GitHub pull requests
        if let Some(project_id) = ctx.user_input.project_id {
            ctx.user_input.notification_targets = self
                .services
                .pipelines
                .get_notification_targets(&hce, project_id)
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StepHandler<PipelineContext> for NotificationsEnter {
    async fn handle(&self, ctx: &mut PipelineContext) -> StepOutcome {
        outcome(self.run(ctx).await)
    }
}

fn validate_source(ctx: &PipelineContext) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("source", ctx.user_input.source.as_ref(), "Please select a source");
    errors.into_result()
}

fn validate_pipeline_details(ctx: &PipelineContext) -> Result<(), ValidationErrors> {
    let input = &ctx.user_input;
    let mut errors = ValidationErrors::new();
    errors.require("repo", input.repo.as_ref(), "Please select a repository");
    errors.require("branch", input.branch.as_ref(), "Please select a branch");
    errors.require_text("name", &input.name, "Please enter a pipeline name");
    errors.require(
        "build_container",
        input.build_container.as_ref(),
        "Please select a build container",
    );
    errors.require(
        "service_instance",
        input.service_instance.as_ref(),
        "Please select a Cloud Foundry endpoint",
    );
    errors.require("organization", input.organization.as_ref(), "Please select an organization");
    errors.require("space", input.space.as_ref(), "Please select a space");
    errors.require_text(
        "cluster_username",
        &input.cluster_username,
        "Please enter the cluster username",
    );
    errors.into_result()
}

/// Picks the steps following the source selection
struct SourceSubflow {
    services: PipelineServices,
}

impl SubflowProvider<PipelineContext> for SourceSubflow {
    fn subflow(&self, ctx: &PipelineContext) -> Vec<Step<PipelineContext>> {
        let vcs_type = ctx
            .user_input
            .source
            .as_ref()
            .map(|s| s.vcs_type)
            .unwrap_or(VcsType::Unsupported);

        let mut steps = vec![
            select_repository_step(&self.services),
            pipeline_details_step(&self.services),
        ];
        if vcs_type.is_github() {
            steps.push(notifications_step(&self.services));
        }
        steps.push(deploy_step());
        steps
    }
}

fn select_source_step(services: &PipelineServices) -> Step<PipelineContext> {
    Step::new("Select Source", "application-source-form")
        .with_template(template("select-source"))
        .with_validator(Arc::new(validate_source))
        .with_on_next(Arc::new(SelectSourceNext {
            services: services.clone(),
        }))
        .with_subflow(Arc::new(SourceSubflow {
            services: services.clone(),
        }))
}

fn select_repository_step(services: &PipelineServices) -> Step<PipelineContext> {
    Step::new("Select Repository", "application-repo-form")
        .with_template(template("select-repository"))
        .with_on_next(Arc::new(SelectRepositoryNext {
            services: services.clone(),
        }))
}

fn pipeline_details_step(services: &PipelineServices) -> Step<PipelineContext> {
    Step::new("Pipeline Details", "application-pipeline-details-form")
        .with_template(template("pipeline-details"))
        .with_next_label("Create pipeline")
        .with_validator(Arc::new(validate_pipeline_details))
        .with_on_next(Arc::new(PipelineDetailsNext {
            services: services.clone(),
        }))
}

fn notifications_step(services: &PipelineServices) -> Step<PipelineContext> {
    Step::new("Notifications", "application-pipeline-notification-form")
        .with_template(template("notification-target-list"))
        .with_on_enter(Arc::new(NotificationsEnter {
            services: services.clone(),
        }))
}

fn deploy_step() -> Step<PipelineContext> {
    Step::new("Deploy App", "application-pipeline-deploy-form")
        .with_template(template("deploy"))
        .with_next_label("Finished code change")
        .last_step()
}

/// Definition used when no pipeline backend is registered
pub fn no_backend_definition() -> WorkflowDefinition<PipelineContext> {
    WorkflowDefinition::new("Add Pipeline").with_step(
        Step::new("No pipeline backend", "application-no-hce-form")
            .with_template(template("no-hce"))
            .with_next_label("Close")
            .last_step(),
    )
}

/// Controller of the add-pipeline wizard
pub struct AddPipelineWorkflow {
    engine: Arc<WorkflowEngine<PipelineContext>>,
    services: PipelineServices,
}

impl AddPipelineWorkflow {
    /// Create a controller driving `engine`
    pub fn new(engine: Arc<WorkflowEngine<PipelineContext>>, services: PipelineServices) -> Self {
        Self { engine, services }
    }

    /// The engine running the wizard
    pub fn engine(&self) -> &Arc<WorkflowEngine<PipelineContext>> {
        &self.engine
    }

    /// The static definition: source selection only
    pub fn definition(&self) -> WorkflowDefinition<PipelineContext> {
        WorkflowDefinition::new("Add Pipeline")
            .with_allow_jump(false)
            .with_allow_back(false)
            .with_cancel_label("Cancel")
            .with_step(select_source_step(&self.services))
    }

    /// Start a fresh run and prefetch backends and VCS sources.
    ///
    /// Prefetch failures are logged and leave the option lists empty. With
    /// no backend registered the wizard is reduced to a single notice step.
    pub async fn start(&self) -> PipelineResult<()> {
        self.engine.start_workflow(self.definition()).await?;
        let run_id = self.engine.run_id().await;

        let instances = match self.services.pipelines.list_hce_instances().await {
            Ok(instances) => instances,
            Err(e) => {
                warn!(error = %e, "Could not list pipeline backends");
                return Ok(());
            }
        };

        let Some(first) = instances.first().cloned() else {
            if self.engine.redefine_for(&run_id, no_backend_definition()).await? {
                info!(run_id = %run_id, "No pipeline backend registered");
            }
            return Ok(());
        };

        let selected = first.clone();
        let applied = self
            .engine
            .update_context_for(&run_id, move |ctx| {
                ctx.options.hce_instances = instances.clone();
                ctx.user_input.hce_instance = Some(selected.clone());
            })
            .await?;

        if applied {
            self.get_vcs_instances(&run_id, &first.guid).await?;
        }
        Ok(())
    }

    async fn get_vcs_instances(&self, run_id: &RunId, hce_guid: &str) -> PipelineResult<()> {
        let instances = match self.services.pipelines.list_vcs_instances(hce_guid).await {
            Ok(instances) => instances,
            Err(e) => {
                warn!(error = %e, hce = hce_guid, "Could not list VCS instances");
                return Ok(());
            }
        };

        let sources: Vec<SelectOption<VcsSource>> = instances
            .into_iter()
            .filter(|s| s.vcs_type != VcsType::Unsupported)
            .map(|s| SelectOption {
                label: s.label.clone(),
                value: s,
            })
            .collect();
        if sources.is_empty() {
            debug!(hce = hce_guid, "No supported VCS instance");
            return Ok(());
        }

        self.engine
            .update_context_for(run_id, move |ctx| {
                ctx.options.sources.extend(sources.iter().cloned());
                ctx.user_input.source = sources.first().map(|o| o.value.clone());
            })
            .await?;
        Ok(())
    }

    async fn begin_repo_load(&self, run_id: &RunId) -> PipelineResult<VcsHeaders> {
        let headers = self
            .engine
            .with_context(|ctx| ctx.user_input.vcs_headers())
            .await;
        let applied = self
            .engine
            .update_context_for(run_id, |ctx| ctx.options.loading_repos = true)
            .await?;
        if !applied {
            return Err(WorkflowError::NotRunning.into());
        }
        Ok(headers)
    }

    async fn end_repo_load(
        &self,
        run_id: &RunId,
        result: RemoteResult<Option<RepoPage>>,
    ) -> PipelineResult<()> {
        let page = result.as_ref().ok().cloned().flatten();
        self.engine
            .update_context_for(run_id, move |ctx| {
                ctx.options.loading_repos = false;
                if let Some(page) = &page {
                    apply_repo_page(&mut ctx.options, page);
                }
            })
            .await?;

        result?;
        Ok(())
    }

    /// Fetch the first page of repositories of the selected source
    pub async fn get_repos(&self) -> PipelineResult<()> {
        let run_id = self.engine.run_id().await;
        let headers = self.begin_repo_load(&run_id).await?;
        let result = self.services.source_control.list_repos(&headers).await;
        self.end_repo_load(&run_id, result.map(Some)).await
    }

    /// Append the next page of repositories
    pub async fn load_more_repos(&self) -> PipelineResult<()> {
        let run_id = self.engine.run_id().await;
        let headers = self.begin_repo_load(&run_id).await?;
        let result = self.services.source_control.next_repos(&headers).await;
        self.end_repo_load(&run_id, result.map(Some)).await
    }

    /// Append the repositories matching `term`
    pub async fn filter_repos(&self, term: &str) -> PipelineResult<()> {
        let run_id = self.engine.run_id().await;
        self.filter_repos_for(&run_id, term).await
    }

    /// Append the repositories matching `term` for the run the term was
    /// typed in. Nothing is fetched once that run has ended or was replaced.
    pub async fn filter_repos_for(&self, run_id: &RunId, term: &str) -> PipelineResult<()> {
        let headers = self.begin_repo_load(run_id).await?;
        debug!(term, "Filtering repositories");
        let result = self.services.source_control.filter_repos(term, &headers).await;
        self.end_repo_load(run_id, result).await
    }

    /// Record the cluster username and look up a matching deployment target
    pub async fn set_cluster_username(
        &self,
        username: impl Into<String>,
    ) -> PipelineResult<Option<DeploymentTarget>> {
        let username = username.into();
        let stored = username.clone();
        self.engine
            .update_context(move |ctx| ctx.user_input.cluster_username = stored.clone())
            .await?;

        if username.is_empty() {
            return Ok(None);
        }
        self.on_cluster_username_changed().await
    }

    /// Match the current endpoint, organization, space and user against the
    /// deployment targets, fetching them on first use
    pub async fn on_cluster_username_changed(&self) -> PipelineResult<Option<DeploymentTarget>> {
        let run_id = self.engine.run_id().await;
        let (hce, cached) = self
            .engine
            .with_context(|ctx| {
                (
                    ctx.user_input.hce_guid().map(str::to_string),
                    ctx.options.deployment_targets.clone(),
                )
            })
            .await;

        let targets = match cached {
            Some(targets) => targets,
            None => {
                let hce = hce.ok_or(PipelineError::MissingInput("pipeline backend"))?;
                let targets = self.services.pipelines.list_deployment_targets(&hce).await?;
                debug!(count = targets.len(), "Deployment targets fetched");
                targets
            }
        };

        let matched = self
            .engine
            .with_context(|ctx| ctx.user_input.find_deployment_target(&targets))
            .await;
        let stored = matched.clone();
        self.engine
            .update_context_for(&run_id, move |ctx| {
                if ctx.options.deployment_targets.is_none() {
                    ctx.options.deployment_targets = Some(targets.clone());
                }
                ctx.options.deployment_target = stored.clone();
            })
            .await?;

        Ok(matched)
    }

    /// Abandon the wizard, discarding everything collected
    pub async fn stop(&self) -> PipelineResult<()> {
        self.engine.stop_workflow().await?;
        Ok(())
    }

    /// Close the wizard after the last step
    pub async fn finish(&self) -> PipelineResult<()> {
        self.engine.finish_workflow().await?;
        Ok(())
    }
}
