//! Write operations against the environment endpoints.
//!
//! Every change the applier makes is first built as a [`Mutation`]. In normal mode it is
//! executed right away; in dry-run mode it becomes a planned change in the report.

use github_client::{api_path, EnvironmentClient, EnvironmentUpdatePayload};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::RepoRef;

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;

/// A single write call for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Mutation {
    PutEnvironment {
        environment: String,
        payload: EnvironmentUpdatePayload,
    },
    DeleteEnvironment {
        environment: String,
    },
    CreateBranchPolicy {
        environment: String,
        name: String,
    },
    DeleteBranchPolicy {
        environment: String,
        branch_policy_id: u64,
    },
    CreateVariable {
        environment: String,
        name: String,
        value: String,
    },
    UpdateVariable {
        environment: String,
        name: String,
        value: String,
    },
    DeleteVariable {
        environment: String,
        name: String,
    },
    CreateProtectionRule {
        environment: String,
        integration_id: u64,
    },
    DeleteProtectionRule {
        environment: String,
        rule_id: u64,
    },
}

impl Mutation {
    /// The environment the mutation targets.
    pub fn environment(&self) -> &str {
        match self {
            Mutation::PutEnvironment { environment, .. }
            | Mutation::DeleteEnvironment { environment }
            | Mutation::CreateBranchPolicy { environment, .. }
            | Mutation::DeleteBranchPolicy { environment, .. }
            | Mutation::CreateVariable { environment, .. }
            | Mutation::UpdateVariable { environment, .. }
            | Mutation::DeleteVariable { environment, .. }
            | Mutation::CreateProtectionRule { environment, .. }
            | Mutation::DeleteProtectionRule { environment, .. } => environment,
        }
    }

    /// The HTTP method and path the mutation is sent to, encoded the way the client sends it.
    pub fn endpoint(&self, repo: &RepoRef) -> Result<String, github_client::Error> {
        let (method, tail): (&str, Vec<String>) = match self {
            Mutation::PutEnvironment { .. } => ("PUT", Vec::new()),
            Mutation::DeleteEnvironment { .. } => ("DELETE", Vec::new()),
            Mutation::CreateBranchPolicy { .. } => {
                ("POST", vec!["deployment-branch-policies".to_string()])
            }
            Mutation::DeleteBranchPolicy {
                branch_policy_id, ..
            } => (
                "DELETE",
                vec![
                    "deployment-branch-policies".to_string(),
                    branch_policy_id.to_string(),
                ],
            ),
            Mutation::CreateVariable { .. } => ("POST", vec!["variables".to_string()]),
            Mutation::UpdateVariable { name, .. } => {
                ("PATCH", vec!["variables".to_string(), name.clone()])
            }
            Mutation::DeleteVariable { name, .. } => {
                ("DELETE", vec!["variables".to_string(), name.clone()])
            }
            Mutation::CreateProtectionRule { .. } => {
                ("POST", vec!["deployment_protection_rules".to_string()])
            }
            Mutation::DeleteProtectionRule { rule_id, .. } => (
                "DELETE",
                vec![
                    "deployment_protection_rules".to_string(),
                    rule_id.to_string(),
                ],
            ),
        };

        let mut segments = vec![
            "repos",
            repo.owner.as_str(),
            repo.repo.as_str(),
            "environments",
            self.environment(),
        ];
        segments.extend(tail.iter().map(String::as_str));
        Ok(format!("{} {}", method, api_path(&segments)?))
    }

    /// The request body, for mutations that send one.
    pub fn body(&self) -> Option<Value> {
        match self {
            Mutation::PutEnvironment { payload, .. } => serde_json::to_value(payload).ok(),
            Mutation::CreateBranchPolicy { name, .. } => Some(json!({ "name": name })),
            Mutation::CreateVariable { name, value, .. }
            | Mutation::UpdateVariable { name, value, .. } => {
                Some(json!({ "name": name, "value": value }))
            }
            Mutation::CreateProtectionRule { integration_id, .. } => {
                Some(json!({ "integration_id": integration_id }))
            }
            Mutation::DeleteEnvironment { .. }
            | Mutation::DeleteBranchPolicy { .. }
            | Mutation::DeleteVariable { .. }
            | Mutation::DeleteProtectionRule { .. } => None,
        }
    }

    /// A one-line human readable description.
    pub fn describe(&self) -> String {
        match self {
            Mutation::PutEnvironment { environment, .. } => {
                format!("Create or update environment '{environment}'")
            }
            Mutation::DeleteEnvironment { environment } => {
                format!("Delete environment '{environment}'")
            }
            Mutation::CreateBranchPolicy { environment, name } => {
                format!("Add deployment branch policy '{name}' to environment '{environment}'")
            }
            Mutation::DeleteBranchPolicy {
                environment,
                branch_policy_id,
            } => format!(
                "Remove deployment branch policy {branch_policy_id} from environment '{environment}'"
            ),
            Mutation::CreateVariable {
                environment, name, ..
            } => format!("Add variable '{name}' to environment '{environment}'"),
            Mutation::UpdateVariable {
                environment, name, ..
            } => format!("Update variable '{name}' in environment '{environment}'"),
            Mutation::DeleteVariable { environment, name } => {
                format!("Remove variable '{name}' from environment '{environment}'")
            }
            Mutation::CreateProtectionRule {
                environment,
                integration_id,
            } => format!(
                "Enable deployment protection rule for app {integration_id} on environment '{environment}'"
            ),
            Mutation::DeleteProtectionRule {
                environment,
                rule_id,
            } => format!(
                "Disable deployment protection rule {rule_id} on environment '{environment}'"
            ),
        }
    }

    /// Sends the mutation to GitHub.
    pub async fn execute(
        &self,
        client: &dyn EnvironmentClient,
        repo: &RepoRef,
    ) -> Result<(), github_client::Error> {
        let (owner, name) = (repo.owner.as_str(), repo.repo.as_str());
        match self {
            Mutation::PutEnvironment {
                environment,
                payload,
            } => {
                client
                    .create_or_update_environment(owner, name, environment, payload)
                    .await?;
            }
            Mutation::DeleteEnvironment { environment } => {
                client.delete_environment(owner, name, environment).await?;
            }
            Mutation::CreateBranchPolicy {
                environment,
                name: policy,
            } => {
                client
                    .create_branch_policy(owner, name, environment, policy)
                    .await?;
            }
            Mutation::DeleteBranchPolicy {
                environment,
                branch_policy_id,
            } => {
                client
                    .delete_branch_policy(owner, name, environment, *branch_policy_id)
                    .await?;
            }
            Mutation::CreateVariable {
                environment,
                name: variable,
                value,
            } => {
                client
                    .create_environment_variable(owner, name, environment, variable, value)
                    .await?;
            }
            Mutation::UpdateVariable {
                environment,
                name: variable,
                value,
            } => {
                client
                    .update_environment_variable(owner, name, environment, variable, value)
                    .await?;
            }
            Mutation::DeleteVariable {
                environment,
                name: variable,
            } => {
                client
                    .delete_environment_variable(owner, name, environment, variable)
                    .await?;
            }
            Mutation::CreateProtectionRule {
                environment,
                integration_id,
            } => {
                client
                    .create_deployment_protection_rule(owner, name, environment, *integration_id)
                    .await?;
            }
            Mutation::DeleteProtectionRule {
                environment,
                rule_id,
            } => {
                client
                    .delete_deployment_protection_rule(owner, name, environment, *rule_id)
                    .await?;
            }
        }

        info!(repo = %repo, action = %self.describe(), "Applied change");
        Ok(())
    }
}
