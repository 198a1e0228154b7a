//! In-memory pipeline backend.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use wizflow_pipeline::model::{
    BuildContainer, DeploymentTarget, HceInstance, ImageRegistry, NewDeploymentTarget,
    NewProject, NotificationTarget, NotificationTargetType, Project, ProjectRepo, VcsSource,
};
use wizflow_pipeline::remote::{PipelineApi, RemoteError, RemoteResult};

/// Backend operation, used to inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineOp {
    /// `list_hce_instances`
    ListHceInstances,
    /// `list_vcs_instances`
    ListVcsInstances,
    /// `list_projects`
    ListProjects,
    /// `list_build_containers`
    ListBuildContainers,
    /// `list_image_registries`
    ListImageRegistries,
    /// `list_deployment_targets`
    ListDeploymentTargets,
    /// `create_deployment_target`
    CreateDeploymentTarget,
    /// `update_deployment_target`
    UpdateDeploymentTarget,
    /// `create_project`
    CreateProject,
    /// `create_cf_binding`
    CreateCfBinding,
    /// `list_notification_target_types`
    ListNotificationTargetTypes,
    /// `get_notification_targets`
    GetNotificationTargets,
}

#[derive(Default)]
struct State {
    hce_instances: Vec<HceInstance>,
    vcs_instances: Vec<VcsSource>,
    projects: Vec<Project>,
    build_containers: Vec<BuildContainer>,
    image_registries: Vec<ImageRegistry>,
    deployment_targets: Vec<DeploymentTarget>,
    notification_target_types: Vec<NotificationTargetType>,
    notification_targets: HashMap<i64, Vec<NotificationTarget>>,
    failing: HashSet<PipelineOp>,
    calls: Vec<PipelineOp>,
    created_targets: Vec<NewDeploymentTarget>,
    updated_targets: Vec<(i64, DeploymentTarget)>,
    created_projects: Vec<NewProject>,
    bindings: Vec<(i64, String)>,
    next_id: i64,
}

/// Pipeline backend fake.
///
/// Creations assign increasing ids starting at 100 and are kept, so a created
/// project shows up in later `list_projects` calls.
#[derive(Clone, Default)]
pub struct InMemoryPipelineApi {
    state: Arc<RwLock<State>>,
}

impl InMemoryPipelineApi {
    /// Creates an empty backend
    pub fn new() -> Self {
        let api = Self::default();
        api.state.write().next_id = 100;
        api
    }

    /// Registered backend instances
    pub fn with_hce_instances(self, instances: Vec<HceInstance>) -> Self {
        self.state.write().hce_instances = instances;
        self
    }

    /// VCS instances of every backend
    pub fn with_vcs_instances(self, sources: Vec<VcsSource>) -> Self {
        self.state.write().vcs_instances = sources;
        self
    }

    /// Existing projects
    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.state.write().projects = projects;
        self
    }

    /// Build containers
    pub fn with_build_containers(self, containers: Vec<BuildContainer>) -> Self {
        self.state.write().build_containers = containers;
        self
    }

    /// Image registries
    pub fn with_image_registries(self, registries: Vec<ImageRegistry>) -> Self {
        self.state.write().image_registries = registries;
        self
    }

    /// Existing deployment targets
    pub fn with_deployment_targets(self, targets: Vec<DeploymentTarget>) -> Self {
        self.state.write().deployment_targets = targets;
        self
    }

    /// Notification target types
    pub fn with_notification_target_types(self, types: Vec<NotificationTargetType>) -> Self {
        self.state.write().notification_target_types = types;
        self
    }

    /// Notification targets the backend attaches to `project_id`
    pub fn with_notification_targets(self, project_id: i64, targets: Vec<NotificationTarget>) -> Self {
        self.state.write().notification_targets.insert(project_id, targets);
        self
    }

    /// Make `op` fail until [`recover`](Self::recover) is called
    pub fn fail(&self, op: PipelineOp) {
        self.state.write().failing.insert(op);
    }

    /// Let `op` succeed again
    pub fn recover(&self, op: PipelineOp) {
        self.state.write().failing.remove(&op);
    }

    /// Operations called so far, in order
    pub fn calls(&self) -> Vec<PipelineOp> {
        self.state.read().calls.clone()
    }

    /// Number of calls to `op`
    pub fn call_count(&self, op: PipelineOp) -> usize {
        self.state.read().calls.iter().filter(|c| **c == op).count()
    }

    /// Deployment target creation payloads
    pub fn created_targets(&self) -> Vec<NewDeploymentTarget> {
        self.state.read().created_targets.clone()
    }

    /// Deployment target updates as `(id, target)`
    pub fn updated_targets(&self) -> Vec<(i64, DeploymentTarget)> {
        self.state.read().updated_targets.clone()
    }

    /// Project creation payloads
    pub fn created_projects(&self) -> Vec<NewProject> {
        self.state.read().created_projects.clone()
    }

    /// Bindings as `(project_id, app_guid)`
    pub fn bindings(&self) -> Vec<(i64, String)> {
        self.state.read().bindings.clone()
    }

    fn record(&self, op: PipelineOp) -> RemoteResult<()> {
        let mut state = self.state.write();
        state.calls.push(op);
        if state.failing.contains(&op) {
            return Err(RemoteError::Request {
                status: 500,
                message: format!("{:?} failed", op),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        let mut state = self.state.write();
        let id = state.next_id;
        state.next_id += 1;
        id
    }
}

#[async_trait]
impl PipelineApi for InMemoryPipelineApi {
    async fn list_hce_instances(&self) -> RemoteResult<Vec<HceInstance>> {
        self.record(PipelineOp::ListHceInstances)?;
        Ok(self.state.read().hce_instances.clone())
    }

    async fn list_vcs_instances(&self, _hce_guid: &str) -> RemoteResult<Vec<VcsSource>> {
        self.record(PipelineOp::ListVcsInstances)?;
        Ok(self.state.read().vcs_instances.clone())
    }

    async fn list_projects(&self, _hce_guid: &str) -> RemoteResult<Vec<Project>> {
        self.record(PipelineOp::ListProjects)?;
        Ok(self.state.read().projects.clone())
    }

    async fn list_build_containers(&self, _hce_guid: &str) -> RemoteResult<Vec<BuildContainer>> {
        self.record(PipelineOp::ListBuildContainers)?;
        Ok(self.state.read().build_containers.clone())
    }

    async fn list_image_registries(&self, _hce_guid: &str) -> RemoteResult<Vec<ImageRegistry>> {
        self.record(PipelineOp::ListImageRegistries)?;
        Ok(self.state.read().image_registries.clone())
    }

    async fn list_deployment_targets(&self, _hce_guid: &str) -> RemoteResult<Vec<DeploymentTarget>> {
        self.record(PipelineOp::ListDeploymentTargets)?;
        Ok(self.state.read().deployment_targets.clone())
    }

    async fn create_deployment_target(
        &self,
        _hce_guid: &str,
        target: NewDeploymentTarget,
    ) -> RemoteResult<DeploymentTarget> {
        self.record(PipelineOp::CreateDeploymentTarget)?;
        let created = DeploymentTarget {
            deployment_target_id: self.next_id(),
            name: target.name.clone(),
            url: target.url.clone(),
            user_name: target.user_name.clone(),
            password: None,
            organization: target.organization.clone(),
            space: target.space.clone(),
        };

        let mut state = self.state.write();
        state.created_targets.push(target);
        state.deployment_targets.push(created.clone());
        Ok(created)
    }

    async fn update_deployment_target(
        &self,
        _hce_guid: &str,
        target_id: i64,
        target: DeploymentTarget,
    ) -> RemoteResult<()> {
        self.record(PipelineOp::UpdateDeploymentTarget)?;
        self.state.write().updated_targets.push((target_id, target));
        Ok(())
    }

    async fn create_project(&self, _hce_guid: &str, project: NewProject) -> RemoteResult<Project> {
        self.record(PipelineOp::CreateProject)?;
        let created = Project {
            id: self.next_id(),
            name: project.name.clone(),
            repo: ProjectRepo {
                full_name: project.repo.full_name.clone(),
                branch: project.branch.clone(),
            },
        };

        let mut state = self.state.write();
        state.created_projects.push(project);
        state.projects.push(created.clone());
        Ok(created)
    }

    async fn create_cf_binding(&self, _hce_guid: &str, project_id: i64, app_guid: &str) -> RemoteResult<()> {
        self.record(PipelineOp::CreateCfBinding)?;
        self.state.write().bindings.push((project_id, app_guid.to_string()));
        Ok(())
    }

    async fn list_notification_target_types(&self, _hce_guid: &str) -> RemoteResult<Vec<NotificationTargetType>> {
        self.record(PipelineOp::ListNotificationTargetTypes)?;
        Ok(self.state.read().notification_target_types.clone())
    }

    async fn get_notification_targets(
        &self,
        _hce_guid: &str,
        project_id: i64,
    ) -> RemoteResult<Vec<NotificationTarget>> {
        self.record(PipelineOp::GetNotificationTargets)?;
        Ok(self
            .state
            .read()
            .notification_targets
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }
}
