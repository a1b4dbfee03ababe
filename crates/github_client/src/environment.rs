//! Deployment environment domain types.
//!
//! This module contains the request and response types for the GitHub deployment
//! environment endpoints and their nested resources: deployment branch policies,
//! environment variables and custom deployment protection rules.
//!
//! See: https://docs.github.com/en/rest/deployments/environments

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;

/// A deployment environment as returned by `GET /repos/{owner}/{repo}/environments`.
///
/// Protection settings are not flat fields on the environment; GitHub reports them as a
/// list of typed protection rules. Use [`Environment::wait_timer`] and
/// [`Environment::required_reviewers`] to read them.
///
/// # Examples
///
/// ```rust
/// use github_client::Environment;
///
/// let json = r#"{
///     "id": 161088068,
///     "name": "staging",
///     "protection_rules": [
///         { "id": 3736, "type": "wait_timer", "wait_timer": 30 }
///     ],
///     "deployment_branch_policy": null
/// }"#;
///
/// let environment: Environment = serde_json::from_str(json).unwrap();
/// assert_eq!(environment.name, "staging");
/// assert_eq!(environment.wait_timer(), 30);
/// assert!(environment.deployment_branch_policy.is_none());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    /// GitHub-assigned environment ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Environment name, in the casing GitHub stores it
    pub name: String,

    /// Protection rules configured on the environment
    #[serde(default)]
    pub protection_rules: Vec<ProtectionRule>,

    /// Branch restriction for deployments; `None` means any branch may deploy
    #[serde(default)]
    pub deployment_branch_policy: Option<DeploymentBranchPolicySettings>,
}

impl Environment {
    /// Returns the configured wait timer in minutes, or 0 if no wait timer rule exists.
    pub fn wait_timer(&self) -> u32 {
        self.protection_rules
            .iter()
            .find_map(|rule| match rule {
                ProtectionRule::WaitTimer { wait_timer } => Some(*wait_timer),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Returns the required reviewers rule, if one is configured.
    ///
    /// The tuple holds the `prevent_self_review` flag and the reviewers.
    pub fn required_reviewers(&self) -> Option<(bool, &[EnvironmentReviewer])> {
        self.protection_rules.iter().find_map(|rule| match rule {
            ProtectionRule::RequiredReviewers {
                prevent_self_review,
                reviewers,
            } => Some((*prevent_self_review, reviewers.as_slice())),
            _ => None,
        })
    }
}

/// A protection rule attached to an environment.
///
/// Branch policy rules and rule types unknown to this client deserialize to
/// [`ProtectionRule::Other`]; the branch policy itself is read from
/// [`Environment::deployment_branch_policy`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtectionRule {
    /// Deployments wait this many minutes before proceeding
    WaitTimer {
        #[serde(default)]
        wait_timer: u32,
    },

    /// Deployments need approval from one of the reviewers
    RequiredReviewers {
        #[serde(default)]
        prevent_self_review: bool,

        #[serde(default)]
        reviewers: Vec<EnvironmentReviewer>,
    },

    /// Any other rule type
    #[serde(other)]
    Other,
}

/// The kind of account that can review deployments.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReviewerType {
    User,
    Team,
}

/// A reviewer entry inside a `required_reviewers` protection rule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentReviewer {
    #[serde(rename = "type")]
    pub reviewer_type: ReviewerType,

    pub reviewer: ReviewerAccount,
}

/// The user or team behind a reviewer entry. Only the ID is needed for configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewerAccount {
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// The deployment branch policy flags of an environment.
///
/// `protected_branches` and `custom_branch_policies` are mutually exclusive on GitHub:
/// when `custom_branch_policies` is set the named policies are managed through the
/// deployment branch policy endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentBranchPolicySettings {
    pub protected_branches: bool,
    pub custom_branch_policies: bool,
}

/// Request body for `PUT /repos/{owner}/{repo}/environments/{environment_name}`.
///
/// `deployment_branch_policy` is always serialized: sending `null` removes the
/// branch restriction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EnvironmentUpdatePayload {
    pub wait_timer: u32,
    pub prevent_self_review: bool,
    pub reviewers: Vec<ReviewerPayload>,
    pub deployment_branch_policy: Option<DeploymentBranchPolicySettings>,
}

/// A reviewer as sent when creating or updating an environment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewerPayload {
    #[serde(rename = "type")]
    pub reviewer_type: ReviewerType,

    pub id: u64,
}

/// A named deployment branch policy (a branch name pattern).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchPolicy {
    pub id: u64,
    pub name: String,

    /// `branch` or `tag`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,
}

/// An environment variable. GitHub returns names upper-cased.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A custom deployment protection rule backed by a GitHub App integration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentProtectionRule {
    /// Rule ID, used for deletion
    pub id: u64,

    #[serde(default)]
    pub enabled: bool,

    /// The app providing the rule; its ID is the integration ID used on creation
    pub app: ProtectionRuleApp,
}

/// The GitHub App behind a custom deployment protection rule.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtectionRuleApp {
    pub id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvironmentList {
    #[serde(default)]
    pub environments: Vec<Environment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BranchPolicyList {
    #[serde(default)]
    pub branch_policies: Vec<BranchPolicy>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnvironmentVariableList {
    #[serde(default)]
    pub variables: Vec<EnvironmentVariable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeploymentProtectionRuleList {
    #[serde(default)]
    pub custom_deployment_protection_rules: Vec<DeploymentProtectionRule>,
}
