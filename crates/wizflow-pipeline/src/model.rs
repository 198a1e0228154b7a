//! Data collected and looked up by the add-pipeline wizard

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the browse URL of the selected VCS
pub const VCS_URL_HEADER: &str = "x-cnap-vcs-url";

/// Header carrying the API URL of the selected VCS
pub const VCS_API_URL_HEADER: &str = "x-cnap-vcs-api-url";

/// Extra request headers routing source-control calls to the selected VCS
pub type VcsHeaders = BTreeMap<String, String>;

/// Kind of version control system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VcsType {
    /// github.com
    Github,
    /// Self-hosted GitHub
    GithubEnterprise,
    /// Bitbucket
    Bitbucket,
    /// GitLab
    Gitlab,
    /// Anything the wizard cannot drive
    #[serde(other)]
    Unsupported,
}

impl VcsType {
    /// GitHub flavours get the notifications step
    pub fn is_github(self) -> bool {
        matches!(self, VcsType::Github | VcsType::GithubEnterprise)
    }

    /// Whether the OAuth handshake runs before listing repositories
    pub fn requires_oauth(self) -> bool {
        self == VcsType::Github
    }
}

/// A VCS instance registered with the pipeline backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsSource {
    /// Kind of VCS
    pub vcs_type: VcsType,
    /// Display label
    pub label: String,
    /// Browse URL, e.g. `https://github.com`
    pub browse_url: String,
    /// API URL, e.g. `https://api.github.com`
    pub api_url: String,
}

/// A source repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`
    pub full_name: String,
    /// Repository description
    #[serde(default)]
    pub description: Option<String>,
}

/// Branch entry of the branch dropdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchOption {
    /// Display label
    pub label: String,
    /// Branch name
    pub value: String,
    /// Branch already built by another project of the same repository
    pub disabled: bool,
}

/// Generic dropdown entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption<T> {
    /// Display label
    pub label: String,
    /// Selected value
    pub value: T,
}

/// Build container offered by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContainer {
    /// Backend id
    pub build_container_id: i64,
    /// Display label
    pub build_container_label: String,
}

/// Image registry offered by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRegistry {
    /// Backend id
    pub image_registry_id: i64,
    /// Display label
    pub registry_label: String,
    /// Registry URL
    pub registry_url: String,
}

/// Named backend environment a pipeline deploys to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    /// Backend id
    pub deployment_target_id: i64,
    /// Display name
    pub name: String,
    /// Cloud Foundry API URL
    pub url: String,
    /// Cluster user
    pub user_name: String,
    /// Cluster password, only sent on create or update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Organization name
    pub organization: String,
    /// Space name
    pub space: String,
}

/// Payload of a deployment target creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeploymentTarget {
    /// Display name
    pub name: String,
    /// Cloud Foundry API URL
    pub url: String,
    /// Cluster user
    pub user_name: String,
    /// Cluster password
    pub password: String,
    /// Organization name
    pub organization: String,
    /// Space name
    pub space: String,
}

/// Repository reference of an existing project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRepo {
    /// `owner/name`
    pub full_name: String,
    /// Built branch
    pub branch: String,
}

/// Pipeline project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Backend id
    pub id: i64,
    /// Project name
    pub name: String,
    /// Built repository
    pub repo: ProjectRepo,
}

/// Payload of a project creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    /// Unique name, see [`UserInput::project_name`]
    pub name: String,
    /// VCS the repository lives in
    pub source: VcsSource,
    /// Target the pipeline deploys to
    pub deployment_target_id: i64,
    /// Container the build runs in
    pub build_container_id: i64,
    /// Built repository
    pub repo: Repository,
    /// Built branch
    pub branch: String,
    /// Browse URL of the VCS
    pub repo_url: String,
}

/// Kind of notification target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTargetType {
    /// Type key, e.g. `slack`
    pub item_type: String,
    /// Display label
    pub label: String,
}

/// Where pipeline events are reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationTarget {
    /// Backend id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Type key
    pub item_type: String,
    /// Destination, e.g. a webhook URL
    pub location: String,
}

/// Pipeline backend instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HceInstance {
    /// Instance guid
    pub guid: String,
    /// Display name
    pub name: String,
}

/// Scheme and host of a service API endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// `http` or `https`
    #[serde(rename = "Scheme")]
    pub scheme: String,
    /// Host and optional port
    #[serde(rename = "Host")]
    pub host: String,
}

impl ServiceEndpoint {
    /// `scheme://host`
    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Cloud Foundry instance the application runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfServiceInstance {
    /// Instance guid
    pub guid: String,
    /// Display name
    pub name: String,
    /// API endpoint
    pub api_endpoint: ServiceEndpoint,
}

/// Organization or space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    /// Entity guid
    pub guid: String,
    /// Entity name
    pub name: String,
}

/// Application the pipeline deploys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Application guid
    pub guid: String,
    /// Application name
    pub name: String,
}

/// Everything the user picks or types across the wizard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInput {
    /// Selected pipeline backend
    pub hce_instance: Option<HceInstance>,
    /// Selected VCS
    pub source: Option<VcsSource>,
    /// Selected repository
    pub repo: Option<Repository>,
    /// Text typed into the repository filter
    pub repo_filter_term: String,
    /// Selected branch
    pub branch: Option<String>,
    /// Pipeline name
    pub name: String,
    /// Selected build container
    pub build_container: Option<BuildContainer>,
    /// Selected image registry
    pub image_registry: Option<ImageRegistry>,
    /// Cloud Foundry instance
    pub service_instance: Option<CfServiceInstance>,
    /// Target organization
    pub organization: Option<NamedEntity>,
    /// Target space
    pub space: Option<NamedEntity>,
    /// Cluster user
    pub cluster_username: String,
    /// Cluster password
    pub cluster_password: Option<String>,
    /// Deployed application
    pub application: Option<Application>,
    /// Project created by the details step
    pub project_id: Option<i64>,
    /// Notification targets attached to the project
    pub notification_targets: Vec<NotificationTarget>,
}

impl UserInput {
    /// Guid of the selected backend
    pub fn hce_guid(&self) -> Option<&str> {
        self.hce_instance.as_ref().map(|h| h.guid.as_str())
    }

    /// API URL of the selected Cloud Foundry instance
    pub fn endpoint_url(&self) -> Option<String> {
        self.service_instance.as_ref().map(|s| s.api_endpoint.url())
    }

    /// `service - org - space - username`
    pub fn deployment_target_name(&self) -> Option<String> {
        let service = self.service_instance.as_ref()?;
        let organization = self.organization.as_ref()?;
        let space = self.space.as_ref()?;
        Some(
            [
                service.name.as_str(),
                organization.name.as_str(),
                space.name.as_str(),
                self.cluster_username.as_str(),
            ]
            .join(" - "),
        )
    }

    /// `name-appGuid`, unique per application
    pub fn project_name(&self) -> Option<String> {
        let application = self.application.as_ref()?;
        Some(format!("{}-{}", self.name, application.guid))
    }

    /// Headers routing source-control calls to the selected VCS
    pub fn vcs_headers(&self) -> VcsHeaders {
        let mut headers = VcsHeaders::new();
        if let Some(source) = &self.source {
            headers.insert(VCS_URL_HEADER.to_string(), source.browse_url.clone());
            headers.insert(VCS_API_URL_HEADER.to_string(), source.api_url.clone());
        }
        headers
    }

    /// Whether a non-empty password was typed
    pub fn has_password(&self) -> bool {
        self.cluster_password
            .as_deref()
            .map(|p| !p.is_empty())
            .unwrap_or(false)
    }

    /// Existing target for the selected endpoint, org, space and user
    pub fn find_deployment_target(&self, targets: &[DeploymentTarget]) -> Option<DeploymentTarget> {
        let url = self.endpoint_url()?;
        let organization = self.organization.as_ref()?;
        let space = self.space.as_ref()?;

        targets
            .iter()
            .find(|t| {
                t.url == url
                    && t.organization == organization.name
                    && t.space == space.name
                    && t.user_name == self.cluster_username
            })
            .cloned()
    }
}

/// Lookup lists built up while the wizard runs
///
/// Lists are appended to so that "load more" keeps earlier pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Pipeline backends
    pub hce_instances: Vec<HceInstance>,
    /// Supported VCS instances
    pub sources: Vec<SelectOption<VcsSource>>,
    /// Repositories fetched so far
    pub repos: Vec<Repository>,
    /// Whether another page of repositories exists
    pub has_more_repos: bool,
    /// A repository request is outstanding
    pub loading_repos: bool,
    /// Branches of the selected repository
    pub branches: Vec<BranchOption>,
    /// Build containers
    pub build_containers: Vec<SelectOption<BuildContainer>>,
    /// Image registries
    pub image_registries: Vec<SelectOption<ImageRegistry>>,
    /// Deployment targets, fetched once per run
    pub deployment_targets: Option<Vec<DeploymentTarget>>,
    /// Target matching the current input
    pub deployment_target: Option<DeploymentTarget>,
    /// Notification target types
    pub notification_target_types: Vec<NotificationTargetType>,
}

/// Context of one add-pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Collected input
    pub user_input: UserInput,
    /// Lookup lists
    pub options: Options,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> CfServiceInstance {
        CfServiceInstance {
            guid: "cf-1".to_string(),
            name: "prod".to_string(),
            api_endpoint: ServiceEndpoint {
                scheme: "https".to_string(),
                host: "api.cf.example.com".to_string(),
            },
        }
    }

    fn named(name: &str) -> Option<NamedEntity> {
        Some(NamedEntity {
            guid: format!("{}-guid", name),
            name: name.to_string(),
        })
    }

    fn target_input() -> UserInput {
        UserInput {
            service_instance: Some(endpoint()),
            organization: named("acme"),
            space: named("dev"),
            cluster_username: "admin".to_string(),
            ..Default::default()
        }
    }

    fn target(id: i64, user: &str) -> DeploymentTarget {
        DeploymentTarget {
            deployment_target_id: id,
            name: "t".to_string(),
            url: "https://api.cf.example.com".to_string(),
            user_name: user.to_string(),
            password: None,
            organization: "acme".to_string(),
            space: "dev".to_string(),
        }
    }

    #[test]
    fn test_deployment_target_name() {
        let input = target_input();
        assert_eq!(
            input.deployment_target_name().as_deref(),
            Some("prod - acme - dev - admin")
        );
        assert_eq!(UserInput::default().deployment_target_name(), None);
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            target_input().endpoint_url().as_deref(),
            Some("https://api.cf.example.com")
        );
    }

    #[test]
    fn test_project_name() {
        let input = UserInput {
            name: "nightly".to_string(),
            application: Some(Application {
                guid: "app-123".to_string(),
                name: "web".to_string(),
            }),
            ..Default::default()
        };
        assert_eq!(input.project_name().as_deref(), Some("nightly-app-123"));
    }

    #[test]
    fn test_vcs_headers() {
        assert!(UserInput::default().vcs_headers().is_empty());

        let input = UserInput {
            source: Some(VcsSource {
                vcs_type: VcsType::Github,
                label: "GitHub".to_string(),
                browse_url: "https://github.com".to_string(),
                api_url: "https://api.github.com".to_string(),
            }),
            ..Default::default()
        };
        let headers = input.vcs_headers();
        assert_eq!(headers.get(VCS_URL_HEADER).map(String::as_str), Some("https://github.com"));
        assert_eq!(
            headers.get(VCS_API_URL_HEADER).map(String::as_str),
            Some("https://api.github.com")
        );
    }

    #[test]
    fn test_find_deployment_target_matches_all_fields() {
        let input = target_input();
        let targets = vec![target(1, "someone-else"), target(2, "admin")];

        let found = input.find_deployment_target(&targets).unwrap();
        assert_eq!(found.deployment_target_id, 2);

        let mut other_space = input.clone();
        other_space.space = named("prod");
        assert!(other_space.find_deployment_target(&targets).is_none());
    }

    #[test]
    fn test_has_password() {
        let mut input = UserInput::default();
        assert!(!input.has_password());
        input.cluster_password = Some(String::new());
        assert!(!input.has_password());
        input.cluster_password = Some("s3cret".to_string());
        assert!(input.has_password());
    }

    #[test]
    fn test_vcs_type_wire_format() {
        let parsed: VcsType = serde_json::from_str("\"GITHUB_ENTERPRISE\"").unwrap();
        assert_eq!(parsed, VcsType::GithubEnterprise);
        assert!(parsed.is_github());
        assert!(!parsed.requires_oauth());

        let unknown: VcsType = serde_json::from_str("\"PERFORCE\"").unwrap();
        assert_eq!(unknown, VcsType::Unsupported);
    }
}
