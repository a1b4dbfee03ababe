//! Creation, update and deletion of a single environment.
//!
//! Each operation issues its calls in order through [`SyncContext::submit`]: the environment
//! itself first, then branch policies, variables and protection rules. Calls are not
//! retried; the first failure ends the operation.

use github_client::{DeploymentBranchPolicySettings, EnvironmentUpdatePayload, ReviewerPayload};
use tracing::{debug, info};

use crate::differ::get_changed;
use crate::{
    DeploymentProtectionRule, EnvironmentEntry, EnvironmentState, Mutation, SyncContext,
    SyncResult, Variable,
};

#[cfg(test)]
#[path = "applier_tests.rs"]
mod tests;

/// Creates an environment together with its branch policies, variables and protection rules.
///
/// Returns the mutations issued, or planned in dry-run mode, in the order they were issued.
pub async fn add(ctx: &SyncContext<'_>, desired: &EnvironmentEntry) -> SyncResult<Vec<Mutation>> {
    let state = desired.resolved();
    let environment = state.name.as_str();
    info!(repo = %ctx.repo, environment, "Creating environment");

    let mut issued = Vec::new();
    issued.push(
        ctx.submit(Mutation::PutEnvironment {
            environment: environment.to_string(),
            payload: update_payload(&state),
        })
        .await?,
    );

    let policy_names = state
        .deployment_branch_policy
        .as_ref()
        .and_then(|policy| policy.custom_branch_policies.names())
        .unwrap_or_default();
    for policy in policy_names {
        issued.push(
            ctx.submit(Mutation::CreateBranchPolicy {
                environment: environment.to_string(),
                name: policy.name.clone(),
            })
            .await?,
        );
    }

    for variable in &state.variables {
        issued.push(ctx.submit(create_variable(environment, variable)).await?);
    }

    for rule in &state.deployment_protection_rules {
        issued.push(
            ctx.submit(Mutation::CreateProtectionRule {
                environment: environment.to_string(),
                integration_id: rule.app_id,
            })
            .await?,
        );
    }

    Ok(issued)
}

/// Brings an existing environment in line with its desired entry.
///
/// Only the attribute groups reported as changed are touched. Protection settings are
/// always sent as a whole. A changed policy with named custom branch policies replaces the
/// existing policies wholesale, so an empty list deletes them all. Variables and protection
/// rules are reconciled item by item.
pub async fn update(
    ctx: &SyncContext<'_>,
    existing: &EnvironmentState,
    desired: &EnvironmentEntry,
) -> SyncResult<Vec<Mutation>> {
    let state = desired.resolved();
    let flags = get_changed(existing, &state);
    let environment = state.name.as_str();
    info!(
        repo = %ctx.repo,
        environment,
        changes = ?flags,
        "Updating environment"
    );

    let mut issued = Vec::new();

    if flags.environment_settings() {
        issued.push(
            ctx.submit(Mutation::PutEnvironment {
                environment: environment.to_string(),
                payload: update_payload(&state),
            })
            .await?,
        );
    }

    let replaced_policies = state
        .deployment_branch_policy
        .as_ref()
        .and_then(|policy| policy.custom_branch_policies.names())
        .filter(|_| flags.deployment_branch_policy);
    if let Some(policy_names) = replaced_policies {
        let current = ctx
            .client
            .list_branch_policies(&ctx.repo.owner, &ctx.repo.repo, environment)
            .await?;
        debug!(
            environment,
            existing = current.len(),
            desired = policy_names.len(),
            "Replacing deployment branch policies"
        );

        for policy in current {
            issued.push(
                ctx.submit(Mutation::DeleteBranchPolicy {
                    environment: environment.to_string(),
                    branch_policy_id: policy.id,
                })
                .await?,
            );
        }
        for policy in policy_names {
            issued.push(
                ctx.submit(Mutation::CreateBranchPolicy {
                    environment: environment.to_string(),
                    name: policy.name.clone(),
                })
                .await?,
            );
        }
    }

    if flags.variables {
        for mutation in variable_mutations(environment, &existing.variables, &state.variables) {
            issued.push(ctx.submit(mutation).await?);
        }
    }

    if flags.deployment_protection_rules {
        for mutation in protection_rule_mutations(
            environment,
            &existing.deployment_protection_rules,
            &state.deployment_protection_rules,
        ) {
            issued.push(ctx.submit(mutation).await?);
        }
    }

    Ok(issued)
}

/// Deletes an environment. Its sub-resources are removed by GitHub along with it.
pub async fn remove(ctx: &SyncContext<'_>, existing: &EnvironmentState) -> SyncResult<Vec<Mutation>> {
    info!(repo = %ctx.repo, environment = existing.name.as_str(), "Deleting environment");
    let mutation = ctx
        .submit(Mutation::DeleteEnvironment {
            environment: existing.name.clone(),
        })
        .await?;
    Ok(vec![mutation])
}

/// Builds the environment update body. Custom branch policies are sent as a flag; the
/// named policies themselves go through their own endpoint.
fn update_payload(state: &EnvironmentState) -> EnvironmentUpdatePayload {
    EnvironmentUpdatePayload {
        wait_timer: state.wait_timer,
        prevent_self_review: state.prevent_self_review,
        reviewers: state
            .reviewers
            .iter()
            .map(|r| ReviewerPayload {
                reviewer_type: r.reviewer_type,
                id: r.id,
            })
            .collect(),
        deployment_branch_policy: state.deployment_branch_policy.as_ref().map(|policy| {
            DeploymentBranchPolicySettings {
                protected_branches: policy.protected_branches,
                custom_branch_policies: policy.custom_branch_policies.is_enabled(),
            }
        }),
    }
}

fn create_variable(environment: &str, variable: &Variable) -> Mutation {
    Mutation::CreateVariable {
        environment: environment.to_string(),
        name: variable.name.clone(),
        value: variable.value.clone(),
    }
}

/// Updates variables whose value changed, creates missing ones and deletes the rest.
fn variable_mutations(
    environment: &str,
    existing: &[Variable],
    desired: &[Variable],
) -> Vec<Mutation> {
    let mut remaining: Vec<&Variable> = existing.iter().collect();
    let mut mutations = Vec::new();

    for variable in desired {
        match remaining.iter().position(|v| v.name == variable.name) {
            Some(index) => {
                let current = remaining.remove(index);
                if current.value != variable.value {
                    mutations.push(Mutation::UpdateVariable {
                        environment: environment.to_string(),
                        name: variable.name.clone(),
                        value: variable.value.clone(),
                    });
                }
            }
            None => mutations.push(create_variable(environment, variable)),
        }
    }

    mutations.extend(remaining.into_iter().map(|v| Mutation::DeleteVariable {
        environment: environment.to_string(),
        name: v.name.clone(),
    }));
    mutations
}

/// Creates rules for unmatched desired apps and deletes unmatched existing rules.
///
/// A desired rule carrying an `id` matches on it first. Without an `id`, or when no
/// existing rule has it, it matches on `app_id`, since an app can only be enabled once.
fn protection_rule_mutations(
    environment: &str,
    existing: &[DeploymentProtectionRule],
    desired: &[DeploymentProtectionRule],
) -> Vec<Mutation> {
    let mut remaining: Vec<&DeploymentProtectionRule> = existing.iter().collect();
    let mut mutations = Vec::new();

    for rule in desired {
        let matched = rule
            .id
            .and_then(|id| remaining.iter().position(|current| current.id == Some(id)))
            .or_else(|| {
                remaining
                    .iter()
                    .position(|current| current.app_id == rule.app_id)
            });
        match matched {
            Some(index) => {
                remaining.remove(index);
            }
            None => mutations.push(Mutation::CreateProtectionRule {
                environment: environment.to_string(),
                integration_id: rule.app_id,
            }),
        }
    }

    // Fetched rules always carry their ID.
    mutations.extend(
        remaining
            .into_iter()
            .filter_map(|rule| rule.id)
            .map(|rule_id| Mutation::DeleteProtectionRule {
                environment: environment.to_string(),
                rule_id,
            }),
    );
    mutations
}
