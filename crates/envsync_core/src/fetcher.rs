//! Retrieval of the current environments of a repository.
//!
//! The fetcher reads the environment list plus, per environment, its branch policies
//! (only when custom policies are switched on), variables and protection rules, and maps
//! all of it into [`EnvironmentState`] so it can be compared with desired entries.

use std::collections::HashSet;

use github_client::{Environment, EnvironmentVariable};
use tracing::{debug, info};

use crate::{
    BranchPolicyName, CustomBranchPolicies, DeploymentBranchPolicy, DeploymentProtectionRule,
    EnvironmentState, Reviewer, SyncContext, SyncError, SyncResult, Variable,
};

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;

/// Fetches and normalizes every environment of the context's repository.
///
/// The order of the result follows GitHub's listing.
///
/// # Errors
///
/// Any failed API call ends the fetch; a missing repository surfaces as a not-found
/// error. A variable name reported twice for one environment yields
/// `SyncError::DuplicateVariable`.
pub async fn find(ctx: &SyncContext<'_>) -> SyncResult<Vec<EnvironmentState>> {
    let (owner, repo) = (ctx.repo.owner.as_str(), ctx.repo.repo.as_str());
    let environments = ctx.client.list_environments(owner, repo).await?;

    let mut mapped = Vec::with_capacity(environments.len());
    for environment in environments {
        mapped.push(map_environment(ctx, environment).await?);
    }

    info!(
        repo = %ctx.repo,
        count = mapped.len(),
        "Fetched current environments"
    );
    Ok(mapped)
}

async fn map_environment(
    ctx: &SyncContext<'_>,
    environment: Environment,
) -> SyncResult<EnvironmentState> {
    let (owner, repo) = (ctx.repo.owner.as_str(), ctx.repo.repo.as_str());
    // Sub-resources are addressed with the name as GitHub stores it.
    let remote_name = environment.name.as_str();
    debug!(environment = remote_name, "Fetching environment sub-resources");

    let (prevent_self_review, reviewers) = match environment.required_reviewers() {
        Some((prevent_self_review, reviewers)) => (
            prevent_self_review,
            reviewers
                .iter()
                .map(|r| Reviewer {
                    id: r.reviewer.id,
                    reviewer_type: r.reviewer_type,
                })
                .collect(),
        ),
        None => (false, Vec::new()),
    };

    let deployment_branch_policy = match &environment.deployment_branch_policy {
        None => None,
        Some(settings) => {
            let custom_branch_policies = if settings.custom_branch_policies {
                let policies = ctx
                    .client
                    .list_branch_policies(owner, repo, remote_name)
                    .await?;
                CustomBranchPolicies::Named(
                    policies
                        .into_iter()
                        .map(|p| BranchPolicyName { name: p.name })
                        .collect(),
                )
            } else {
                CustomBranchPolicies::Flag(false)
            };
            Some(DeploymentBranchPolicy {
                protected_branches: settings.protected_branches,
                custom_branch_policies,
            })
        }
    };

    let variables = ctx
        .client
        .list_environment_variables(owner, repo, remote_name)
        .await?;
    let variables = map_variables(remote_name, variables)?;

    let deployment_protection_rules = ctx
        .client
        .list_deployment_protection_rules(owner, repo, remote_name)
        .await?
        .into_iter()
        .map(|rule| DeploymentProtectionRule {
            app_id: rule.app.id,
            id: Some(rule.id),
        })
        .collect();

    Ok(EnvironmentState {
        name: environment.name.to_lowercase(),
        wait_timer: environment.wait_timer(),
        prevent_self_review,
        reviewers,
        deployment_branch_policy,
        variables,
        deployment_protection_rules,
    })
}

/// Lowercases variable names and rejects duplicates.
fn map_variables(
    environment: &str,
    variables: Vec<EnvironmentVariable>,
) -> SyncResult<Vec<Variable>> {
    let mut seen = HashSet::new();
    variables
        .into_iter()
        .map(|variable| {
            let name = variable.name.to_lowercase();
            if !seen.insert(name.clone()) {
                return Err(SyncError::DuplicateVariable {
                    environment: environment.to_lowercase(),
                    name,
                });
            }
            Ok(Variable {
                name,
                value: variable.value,
            })
        })
        .collect()
}
