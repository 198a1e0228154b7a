//! Add-pipeline fixtures.

use wizflow_pipeline::model::{
    Application, BuildContainer, CfServiceInstance, DeploymentTarget, HceInstance, ImageRegistry,
    NamedEntity, NewDeploymentTarget, NewProject, NotificationTarget, NotificationTargetType,
    Project, ProjectRepo, Repository, ServiceEndpoint, UserInput, VcsSource, VcsType,
};
use wizflow_pipeline::RepoPage;

/// Cloud Foundry endpoint every fixture deploys to
pub const CF_API_URL: &str = "https://api.cf.example.com";

/// Guid of [`application`]
pub const APP_GUID: &str = "app-guid-1";

/// Backend instance `hce-<n>`
pub fn hce_instance(n: usize) -> HceInstance {
    HceInstance {
        guid: format!("hce-{}", n),
        name: format!("Pipelines {}", n),
    }
}

/// github.com
pub fn github_source() -> VcsSource {
    VcsSource {
        vcs_type: VcsType::Github,
        label: "GitHub".to_string(),
        browse_url: "https://github.com".to_string(),
        api_url: "https://api.github.com".to_string(),
    }
}

/// Self-hosted GitHub
pub fn github_enterprise_source() -> VcsSource {
    VcsSource {
        vcs_type: VcsType::GithubEnterprise,
        label: "GitHub Enterprise".to_string(),
        browse_url: "https://github.example.com".to_string(),
        api_url: "https://github.example.com/api/v3".to_string(),
    }
}

/// GitLab
pub fn gitlab_source() -> VcsSource {
    VcsSource {
        vcs_type: VcsType::Gitlab,
        label: "GitLab".to_string(),
        browse_url: "https://gitlab.com".to_string(),
        api_url: "https://gitlab.com/api/v4".to_string(),
    }
}

/// A VCS type the wizard cannot drive
pub fn unsupported_source() -> VcsSource {
    VcsSource {
        vcs_type: VcsType::Unsupported,
        label: "Perforce".to_string(),
        browse_url: "https://p4.example.com".to_string(),
        api_url: "https://p4.example.com/api".to_string(),
    }
}

/// Repository `full_name`
pub fn repository(full_name: &str) -> Repository {
    Repository {
        full_name: full_name.to_string(),
        description: None,
    }
}

/// Page holding `names`
pub fn repo_page(names: &[&str], has_more: bool) -> RepoPage {
    RepoPage {
        repos: names.iter().map(|n| repository(n)).collect(),
        has_more,
    }
}

/// Existing project building `branch` of `full_name`
pub fn project(id: i64, full_name: &str, branch: &str) -> Project {
    Project {
        id,
        name: format!("project-{}", id),
        repo: ProjectRepo {
            full_name: full_name.to_string(),
            branch: branch.to_string(),
        },
    }
}

/// Linux build container
pub fn build_container() -> BuildContainer {
    BuildContainer {
        build_container_id: 7,
        build_container_label: "Linux x64".to_string(),
    }
}

/// Docker Hub registry
pub fn image_registry() -> ImageRegistry {
    ImageRegistry {
        image_registry_id: 3,
        registry_label: "Docker Hub".to_string(),
        registry_url: "https://index.docker.io".to_string(),
    }
}

/// Cloud Foundry instance at [`CF_API_URL`]
pub fn service_instance() -> CfServiceInstance {
    CfServiceInstance {
        guid: "cf-1".to_string(),
        name: "prod".to_string(),
        api_endpoint: ServiceEndpoint {
            scheme: "https".to_string(),
            host: "api.cf.example.com".to_string(),
        },
    }
}

/// Organization or space called `name`
pub fn named_entity(name: &str) -> NamedEntity {
    NamedEntity {
        guid: format!("{}-guid", name),
        name: name.to_string(),
    }
}

/// The deployed application
pub fn application() -> Application {
    Application {
        guid: APP_GUID.to_string(),
        name: "web".to_string(),
    }
}

/// Existing target for `prod`, org `acme`, space `dev` and `user_name`
pub fn deployment_target(id: i64, user_name: &str) -> DeploymentTarget {
    DeploymentTarget {
        deployment_target_id: id,
        name: format!("prod - acme - dev - {}", user_name),
        url: CF_API_URL.to_string(),
        user_name: user_name.to_string(),
        password: None,
        organization: "acme".to_string(),
        space: "dev".to_string(),
    }
}

/// Creation payload of a deployment target
pub fn new_target() -> NewDeploymentTarget {
    NewDeploymentTarget {
        name: "prod - acme - dev - admin".to_string(),
        url: CF_API_URL.to_string(),
        user_name: "admin".to_string(),
        password: "s3cret".to_string(),
        organization: "acme".to_string(),
        space: "dev".to_string(),
    }
}

/// Creation payload of a project
pub fn new_project(full_name: &str, branch: &str) -> NewProject {
    NewProject {
        name: format!("ci-{}", APP_GUID),
        source: github_source(),
        deployment_target_id: 100,
        build_container_id: build_container().build_container_id,
        repo: repository(full_name),
        branch: branch.to_string(),
        repo_url: github_source().browse_url,
    }
}

/// Slack notification type
pub fn slack_type() -> NotificationTargetType {
    NotificationTargetType {
        item_type: "slack".to_string(),
        label: "Slack".to_string(),
    }
}

/// Notification target attached by the backend
pub fn notification_target(id: i64) -> NotificationTarget {
    NotificationTarget {
        id,
        name: "GitHub pull requests".to_string(),
        item_type: "githubpullrequest".to_string(),
        location: "https://github.com/org/app".to_string(),
    }
}

/// Pipeline-details input that passes validation.
///
/// Source and backend are left to the running wizard.
pub fn details_input(full_name: &str, branch: &str) -> UserInput {
    UserInput {
        repo: Some(repository(full_name)),
        branch: Some(branch.to_string()),
        name: "ci".to_string(),
        build_container: Some(build_container()),
        service_instance: Some(service_instance()),
        organization: Some(named_entity("acme")),
        space: Some(named_entity("dev")),
        cluster_username: "admin".to_string(),
        cluster_password: Some("s3cret".to_string()),
        application: Some(application()),
        ..Default::default()
    }
}
