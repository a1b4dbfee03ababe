//! Environment configuration types.
//!
//! [`EnvironmentEntry`] is the declared (desired) shape of an environment, where every
//! attribute except the name may be left unspecified. [`EnvironmentState`] is the fully
//! populated shape shared by fetched environments and resolved desired entries, which is
//! what the differ compares.

use github_client::ReviewerType;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;

/// A user or team allowed to approve deployments.
///
/// Ordering is by `id` first, which is the order reviewer lists are compared in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: u64,

    #[serde(rename = "type")]
    pub reviewer_type: ReviewerType,
}

/// A named deployment branch policy (a branch name pattern such as `release/*`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchPolicyName {
    pub name: String,
}

/// The `custom_branch_policies` part of a deployment branch policy.
///
/// Configuration may give either a flag or an explicit list of branch patterns. A list
/// turns the patterns into a sub-collection managed through the branch policy endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomBranchPolicies {
    Flag(bool),
    Named(Vec<BranchPolicyName>),
}

impl CustomBranchPolicies {
    /// Whether custom branch policies are switched on. Any list counts as on, even an empty one.
    pub fn is_enabled(&self) -> bool {
        match self {
            CustomBranchPolicies::Flag(enabled) => *enabled,
            CustomBranchPolicies::Named(_) => true,
        }
    }

    /// The named policies, if the policies were given as a list.
    pub fn names(&self) -> Option<&[BranchPolicyName]> {
        match self {
            CustomBranchPolicies::Flag(_) => None,
            CustomBranchPolicies::Named(names) => Some(names),
        }
    }

    /// Returns a copy with named policies in lexical order.
    pub fn sorted(&self) -> CustomBranchPolicies {
        match self {
            CustomBranchPolicies::Flag(enabled) => CustomBranchPolicies::Flag(*enabled),
            CustomBranchPolicies::Named(names) => {
                let mut names = names.clone();
                names.sort();
                CustomBranchPolicies::Named(names)
            }
        }
    }
}

impl Default for CustomBranchPolicies {
    fn default() -> Self {
        CustomBranchPolicies::Flag(false)
    }
}

/// Restriction on which branches may deploy to an environment.
///
/// The absence of a policy (`None` wherever this type is optional) means any branch may
/// deploy. A policy with `custom_branch_policies` off means protected branches only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DeploymentBranchPolicy {
    #[serde(default)]
    pub protected_branches: bool,

    #[serde(default)]
    pub custom_branch_policies: CustomBranchPolicies,
}

/// An environment variable, keyed by its lowercase name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

/// A custom deployment protection rule.
///
/// `app_id` identifies the GitHub App providing the rule. `id` is assigned by GitHub and is
/// only known for fetched rules; it is what deletion uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentProtectionRule {
    pub app_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

/// A declared environment.
///
/// Unset attributes are "not specified". Deserializing `null` and leaving the key out both
/// produce `None`, so explicit nulls coming from overrides are dropped on the way in.
///
/// # Examples
///
/// ```rust
/// use envsync_core::EnvironmentEntry;
///
/// let entry: EnvironmentEntry = serde_json::from_str(r#"{ "name": "Production" }"#).unwrap();
/// let resolved = entry.resolved();
///
/// assert_eq!(resolved.wait_timer, 0);
/// assert!(resolved.deployment_branch_policy.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvironmentEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timer: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prevent_self_review: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewers: Option<Vec<Reviewer>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_branch_policy: Option<DeploymentBranchPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_protection_rules: Option<Vec<DeploymentProtectionRule>>,
}

impl EnvironmentEntry {
    /// Creates an entry with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Fills every unspecified attribute with its default.
    ///
    /// Defaults: no wait timer, self review allowed, no reviewers, no branch policy, no
    /// variables and no protection rules.
    pub fn resolved(&self) -> EnvironmentState {
        EnvironmentState {
            name: self.name.clone(),
            wait_timer: self.wait_timer.unwrap_or(0),
            prevent_self_review: self.prevent_self_review.unwrap_or(false),
            reviewers: self.reviewers.clone().unwrap_or_default(),
            deployment_branch_policy: self.deployment_branch_policy.clone(),
            variables: self.variables.clone().unwrap_or_default(),
            deployment_protection_rules: self
                .deployment_protection_rules
                .clone()
                .unwrap_or_default(),
        }
    }
}

/// A fully populated environment.
///
/// Produced by the fetcher for environments that exist on GitHub, and by
/// [`EnvironmentEntry::resolved`] for desired entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentState {
    pub name: String,
    pub wait_timer: u32,
    pub prevent_self_review: bool,
    pub reviewers: Vec<Reviewer>,
    pub deployment_branch_policy: Option<DeploymentBranchPolicy>,
    pub variables: Vec<Variable>,
    pub deployment_protection_rules: Vec<DeploymentProtectionRule>,
}
