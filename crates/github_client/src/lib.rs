//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides a client for the deployment environment endpoints of a repository:
//! the environments themselves, their deployment branch policies, their variables and
//! their custom deployment protection rules. Requests are authenticated either with a
//! personal access token or as a GitHub App installation.

use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use octocrab::{Octocrab, Result as OctocrabResult};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use url::Url;

pub mod errors;
pub use errors::Error;

pub mod environment;
pub use environment::{
    BranchPolicy, DeploymentBranchPolicySettings, DeploymentProtectionRule, Environment,
    EnvironmentReviewer, EnvironmentUpdatePayload, EnvironmentVariable, ProtectionRule,
    ProtectionRuleApp, ReviewerAccount, ReviewerPayload, ReviewerType,
};

use environment::{
    BranchPolicyList, DeploymentProtectionRuleList, EnvironmentList, EnvironmentVariableList,
};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Page size requested from list endpoints. Following further pages is left to the caller.
const PER_PAGE: u8 = 100;

/// A client for interacting with the GitHub API.
#[derive(Debug)]
pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` from an authenticated `Octocrab` instance.
    ///
    /// Use [`create_token_client`] or [`create_app_client`] together with
    /// [`authenticate_with_access_token`] to obtain one.
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    async fn get_list<R>(&self, message: &str, path: String) -> Result<R, Error>
    where
        R: octocrab::FromResponse,
    {
        debug!(path = path.as_str(), "Making API call");
        let response: OctocrabResult<R> = self
            .client
            .get(path, Some(&ListParams { per_page: PER_PAGE }))
            .await;
        response.map_err(|e| map_octocrab_error(message, e))
    }
}

#[derive(Debug, Serialize)]
struct ListParams {
    per_page: u8,
}

#[derive(Debug, Serialize)]
struct NamePayload<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct VariablePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct IntegrationPayload {
    integration_id: u64,
}

/// Operations on the deployment environments of a repository.
///
/// All methods take the repository owner and name. Methods that work on a single
/// environment take the environment name as stored (or to be stored) on GitHub;
/// it is path-encoded by the implementation.
#[async_trait]
pub trait EnvironmentClient: Send + Sync {
    /// Lists the environments of a repository, including their protection rules.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the repository does not exist.
    async fn list_environments(&self, owner: &str, repo: &str) -> Result<Vec<Environment>, Error>;

    /// Creates an environment, or replaces the protection settings of an existing one.
    async fn create_or_update_environment(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        payload: &EnvironmentUpdatePayload,
    ) -> Result<Environment, Error>;

    /// Deletes an environment. GitHub removes its branch policies, variables and
    /// protection rules with it.
    async fn delete_environment(&self, owner: &str, repo: &str, environment: &str)
        -> Result<(), Error>;

    /// Lists the custom deployment branch policies of an environment.
    async fn list_branch_policies(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<Vec<BranchPolicy>, Error>;

    /// Creates a deployment branch policy for the given branch name pattern.
    async fn create_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<BranchPolicy, Error>;

    /// Deletes a deployment branch policy by ID.
    async fn delete_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        branch_policy_id: u64,
    ) -> Result<(), Error>;

    /// Lists the variables of an environment.
    async fn list_environment_variables(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<Vec<EnvironmentVariable>, Error>;

    /// Creates an environment variable.
    async fn create_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), Error>;

    /// Updates the value of an existing environment variable.
    async fn update_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), Error>;

    /// Deletes an environment variable.
    async fn delete_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<(), Error>;

    /// Lists the custom deployment protection rules enabled on an environment.
    async fn list_deployment_protection_rules(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<Vec<DeploymentProtectionRule>, Error>;

    /// Enables the custom deployment protection rule provided by the given GitHub App.
    async fn create_deployment_protection_rule(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        integration_id: u64,
    ) -> Result<DeploymentProtectionRule, Error>;

    /// Disables a custom deployment protection rule by rule ID.
    async fn delete_deployment_protection_rule(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        rule_id: u64,
    ) -> Result<(), Error>;
}

#[async_trait]
impl EnvironmentClient for GitHubClient {
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn list_environments(&self, owner: &str, repo: &str) -> Result<Vec<Environment>, Error> {
        let path = api_path(&["repos", owner, repo, "environments"])?;
        let list: EnvironmentList = self.get_list("Failed to list environments", path).await?;

        info!(
            owner = owner,
            repo = repo,
            count = list.environments.len(),
            "Retrieved environments"
        );
        Ok(list.environments)
    }

    #[instrument(skip(self, payload), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn create_or_update_environment(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        payload: &EnvironmentUpdatePayload,
    ) -> Result<Environment, Error> {
        let path = api_path(&["repos", owner, repo, "environments", environment])?;
        let response: OctocrabResult<Environment> = self.client.put(path, Some(payload)).await;
        response.map_err(|e| map_octocrab_error("Failed to create or update environment", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn delete_environment(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<(), Error> {
        let path = api_path(&["repos", owner, repo, "environments", environment])?;
        let response = match self.client._delete(path.as_str(), None::<&()>).await {
            Ok(r) => octocrab::map_github_error(r).await.map(drop),
            Err(e) => Err(e),
        };
        response.map_err(|e| map_octocrab_error("Failed to delete environment", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn list_branch_policies(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<Vec<BranchPolicy>, Error> {
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "deployment-branch-policies",
        ])?;
        let list: BranchPolicyList = self
            .get_list("Failed to list deployment branch policies", path)
            .await?;
        Ok(list.branch_policies)
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn create_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<BranchPolicy, Error> {
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "deployment-branch-policies",
        ])?;
        let response: OctocrabResult<BranchPolicy> = self
            .client
            .post(path, Some(&NamePayload { name }))
            .await;
        response.map_err(|e| map_octocrab_error("Failed to create deployment branch policy", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn delete_branch_policy(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        branch_policy_id: u64,
    ) -> Result<(), Error> {
        let id = branch_policy_id.to_string();
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "deployment-branch-policies",
            id.as_str(),
        ])?;
        let response = match self.client._delete(path.as_str(), None::<&()>).await {
            Ok(r) => octocrab::map_github_error(r).await.map(drop),
            Err(e) => Err(e),
        };
        response.map_err(|e| map_octocrab_error("Failed to delete deployment branch policy", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn list_environment_variables(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<Vec<EnvironmentVariable>, Error> {
        let path = api_path(&["repos", owner, repo, "environments", environment, "variables"])?;
        let list: EnvironmentVariableList = self
            .get_list("Failed to list environment variables", path)
            .await?;
        Ok(list.variables)
    }

    #[instrument(skip(self, value), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn create_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        let path = api_path(&["repos", owner, repo, "environments", environment, "variables"])?;
        let body = VariablePayload {
            name: Some(name),
            value,
        };
        let response = match self.client._post(path.as_str(), Some(&body)).await {
            Ok(r) => octocrab::map_github_error(r).await.map(drop),
            Err(e) => Err(e),
        };
        response.map_err(|e| map_octocrab_error("Failed to create environment variable", e))
    }

    #[instrument(skip(self, value), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn update_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "variables",
            name,
        ])?;
        let body = VariablePayload {
            name: Some(name),
            value,
        };
        let response = match self.client._patch(path.as_str(), Some(&body)).await {
            Ok(r) => octocrab::map_github_error(r).await.map(drop),
            Err(e) => Err(e),
        };
        response.map_err(|e| map_octocrab_error("Failed to update environment variable", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn delete_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<(), Error> {
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "variables",
            name,
        ])?;
        let response = match self.client._delete(path.as_str(), None::<&()>).await {
            Ok(r) => octocrab::map_github_error(r).await.map(drop),
            Err(e) => Err(e),
        };
        response.map_err(|e| map_octocrab_error("Failed to delete environment variable", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn list_deployment_protection_rules(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<Vec<DeploymentProtectionRule>, Error> {
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "deployment_protection_rules",
        ])?;
        let list: DeploymentProtectionRuleList = self
            .get_list("Failed to list deployment protection rules", path)
            .await?;
        Ok(list.custom_deployment_protection_rules)
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn create_deployment_protection_rule(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        integration_id: u64,
    ) -> Result<DeploymentProtectionRule, Error> {
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "deployment_protection_rules",
        ])?;
        let response: OctocrabResult<DeploymentProtectionRule> = self
            .client
            .post(path, Some(&IntegrationPayload { integration_id }))
            .await;
        response
            .map_err(|e| map_octocrab_error("Failed to create deployment protection rule", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, environment = %environment))]
    async fn delete_deployment_protection_rule(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        rule_id: u64,
    ) -> Result<(), Error> {
        let id = rule_id.to_string();
        let path = api_path(&[
            "repos",
            owner,
            repo,
            "environments",
            environment,
            "deployment_protection_rules",
            id.as_str(),
        ])?;
        let response = match self.client._delete(path.as_str(), None::<&()>).await {
            Ok(r) => octocrab::map_github_error(r).await.map(drop),
            Err(e) => Err(e),
        };
        response.map_err(|e| map_octocrab_error("Failed to delete deployment protection rule", e))
    }
}

/// Builds a percent-encoded API path from raw segments.
///
/// Environment and variable names may contain characters that are not valid in a URL
/// path, so every segment is encoded individually.
pub fn api_path(segments: &[&str]) -> Result<String, Error> {
    let mut url =
        Url::parse("https://api.github.com/").map_err(|e| Error::InvalidPath(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidPath("URL cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.path().to_string())
}

/// Authenticates with GitHub using an installation access token for a specific app installation.
///
/// This function retrieves an access token for a GitHub App installation and creates a new
/// `Octocrab` client authenticated with that token.
///
/// # Arguments
///
/// * `octocrab` - An `Octocrab` client authenticated as the GitHub App.
/// * `installation_id` - The ID of the GitHub App installation.
/// * `repository_owner` - The owner of the repository associated with the installation.
/// * `source_repository` - The name of the repository associated with the installation.
///
/// # Errors
///
/// Returns `Error::InvalidResponse` if the installation cannot be found or no access
/// token can be created for it.
///
/// # Example
///
/// ```rust,no_run
/// use github_client::{authenticate_with_access_token, create_app_client, Error};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Error> {
///     let private_key = std::fs::read_to_string("app.pem").unwrap();
///     let app_client = create_app_client(123456, &private_key, None).await?;
///
///     let authenticated_client =
///         authenticate_with_access_token(&app_client, 12345678, "example-owner", "example-repo")
///             .await?;
///
///     // Use `authenticated_client` to perform API operations
///     Ok(())
/// }
/// ```
#[instrument(skip(octocrab))]
pub async fn authenticate_with_access_token(
    octocrab: &Octocrab,
    installation_id: u64,
    repository_owner: &str,
    source_repository: &str,
) -> Result<Octocrab, Error> {
    debug!(
        repository_owner = repository_owner,
        repository = source_repository,
        installation_id,
        "Finding installation"
    );

    let (api_with_token, _) = octocrab
        .installation_and_token(installation_id.into())
        .await
        .map_err(|e| {
            error!(
                repository_owner = repository_owner,
                repository = source_repository,
                installation_id,
                "Failed to create a token for the installation",
            );
            log_octocrab_error("Failed to create installation token", e);

            Error::InvalidResponse
        })?;

    info!(
        repository_owner = repository_owner,
        repository = source_repository,
        installation_id,
        "Created access token for installation",
    );

    Ok(api_with_token)
}

/// Creates an `Octocrab` client authenticated as a GitHub App using a JWT token.
///
/// # Arguments
///
/// * `app_id` - The ID of the GitHub App.
/// * `private_key` - The private key associated with the GitHub App, in PEM format.
/// * `base_uri` - API root to use instead of `https://api.github.com`, e.g. for GitHub
///   Enterprise Server.
///
/// # Errors
///
/// Returns `Error::AuthError` if the private key cannot be parsed or the client cannot
/// be built.
#[instrument(skip(private_key))]
pub async fn create_app_client(
    app_id: u64,
    private_key: &str,
    base_uri: Option<&str>,
) -> Result<Octocrab, Error> {
    info!(
        app_id = app_id,
        key_length = private_key.len(),
        "Creating GitHub App client with provided credentials"
    );

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        error!(
            app_id = app_id,
            error = %e,
            "Failed to parse RSA private key - key format is invalid"
        );
        Error::AuthError(format!(
            "Failed to translate the private key. Error was: {}",
            e
        ))
    })?;

    let mut builder = Octocrab::builder();
    if let Some(uri) = base_uri {
        builder = builder
            .base_uri(uri)
            .map_err(|e| Error::AuthError(format!("Invalid API base URI '{}': {}", uri, e)))?;
    }

    let octocrab = builder.app(app_id.into(), key).build().map_err(|e| {
        error!(
            app_id = app_id,
            error = ?e,
            "Failed to build Octocrab client with GitHub App credentials"
        );
        Error::AuthError("Failed to get a personal token for the app install.".to_string())
    })?;

    info!(app_id = app_id, "Successfully created GitHub App client");

    Ok(octocrab)
}

/// Creates an `Octocrab` client authenticated with a personal access token.
///
/// `base_uri` overrides the API root, which is how tests point the client at a mock server.
#[instrument(skip(token))]
pub fn create_token_client(token: &str, base_uri: Option<&str>) -> Result<Octocrab, Error> {
    let mut builder = Octocrab::builder();
    if let Some(uri) = base_uri {
        builder = builder
            .base_uri(uri)
            .map_err(|e| Error::AuthError(format!("Invalid API base URI '{}': {}", uri, e)))?;
    }

    builder
        .personal_token(token.to_string())
        .build()
        .map_err(|e| Error::AuthError(format!("Failed to build token client: {}", e)))
}

fn map_octocrab_error(message: &str, e: octocrab::Error) -> Error {
    let mapped = match &e {
        octocrab::Error::GitHub { source, .. } => {
            Error::from_status(source.status_code.as_u16(), source.message.clone())
        }
        other => Error::ApiError {
            status: None,
            message: other.to_string(),
        },
    };

    // A missing resource is an expected answer for most callers.
    if mapped.is_not_found() {
        debug!(context = message, "GitHub returned 404");
    } else {
        log_octocrab_error(message, e);
    }

    mapped
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = source;
            error!(
                error_message = err.message,
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),

        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
