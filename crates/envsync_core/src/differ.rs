//! Attribute-level change detection between an existing and a desired environment.
//!
//! Lists are compared as sets: both sides are sorted before comparison, so the order in
//! which reviewers, variables, rules or branch policies are declared never registers as a
//! change.

use crate::{
    CustomBranchPolicies, DeploymentBranchPolicy, DeploymentProtectionRule, EnvironmentEntry,
    EnvironmentState, Reviewer, Variable,
};

#[cfg(test)]
#[path = "differ_tests.rs"]
mod tests;

/// Which attribute groups of an environment differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub wait_timer: bool,
    pub prevent_self_review: bool,
    pub reviewers: bool,
    pub deployment_branch_policy: bool,
    pub variables: bool,
    pub deployment_protection_rules: bool,
}

impl ChangeSet {
    /// Returns `true` if any attribute group differs.
    pub fn any(&self) -> bool {
        self.environment_settings() || self.variables || self.deployment_protection_rules
    }

    /// Returns `true` if a setting carried by the environment update call differs.
    ///
    /// Wait timer, self review, reviewers and branch policy are always sent together.
    pub fn environment_settings(&self) -> bool {
        self.wait_timer || self.prevent_self_review || self.reviewers || self.deployment_branch_policy
    }
}

/// Pairs an existing environment with a desired entry. Names match case-insensitively.
pub fn comparator(existing: &EnvironmentState, desired: &EnvironmentEntry) -> bool {
    existing.name.to_lowercase() == desired.name.to_lowercase()
}

/// Computes the change flags between an existing environment and a resolved desired one.
///
/// Resolve desired entries with [`EnvironmentEntry::resolved`] first, so unspecified
/// attributes compare as their defaults.
pub fn get_changed(existing: &EnvironmentState, desired: &EnvironmentState) -> ChangeSet {
    ChangeSet {
        wait_timer: existing.wait_timer != desired.wait_timer,
        prevent_self_review: existing.prevent_self_review != desired.prevent_self_review,
        reviewers: reviewers_differ(&existing.reviewers, &desired.reviewers),
        deployment_branch_policy: branch_policy_differs(
            existing.deployment_branch_policy.as_ref(),
            desired.deployment_branch_policy.as_ref(),
        ),
        variables: variables_differ(&existing.variables, &desired.variables),
        deployment_protection_rules: protection_rules_differ(
            &existing.deployment_protection_rules,
            &desired.deployment_protection_rules,
        ),
    }
}

/// Returns `true` if the desired entry requires an update of the existing environment.
pub fn changed(existing: &EnvironmentState, desired: &EnvironmentEntry) -> bool {
    get_changed(existing, &desired.resolved()).any()
}

fn reviewers_differ(existing: &[Reviewer], desired: &[Reviewer]) -> bool {
    sorted(existing) != sorted(desired)
}

fn branch_policy_differs(
    existing: Option<&DeploymentBranchPolicy>,
    desired: Option<&DeploymentBranchPolicy>,
) -> bool {
    match (existing, desired) {
        (None, None) => false,
        (Some(_), None) | (None, Some(_)) => true,
        (Some(existing), Some(desired)) => {
            existing.protected_branches != desired.protected_branches
                || custom_policies_differ(
                    &existing.custom_branch_policies,
                    &desired.custom_branch_policies,
                )
        }
    }
}

/// A desired flag only manages the switch; whatever policies are named on GitHub are left
/// alone. A desired list manages the names too.
fn custom_policies_differ(
    existing: &CustomBranchPolicies,
    desired: &CustomBranchPolicies,
) -> bool {
    match desired {
        CustomBranchPolicies::Flag(enabled) => existing.is_enabled() != *enabled,
        CustomBranchPolicies::Named(_) => match existing {
            CustomBranchPolicies::Named(_) => existing.sorted() != desired.sorted(),
            CustomBranchPolicies::Flag(_) => true,
        },
    }
}

fn variables_differ(existing: &[Variable], desired: &[Variable]) -> bool {
    sorted(existing) != sorted(desired)
}

/// Rules are compared by app only; the rule ID is assigned by GitHub.
fn protection_rules_differ(
    existing: &[DeploymentProtectionRule],
    desired: &[DeploymentProtectionRule],
) -> bool {
    let app_ids = |rules: &[DeploymentProtectionRule]| {
        let mut ids: Vec<u64> = rules.iter().map(|r| r.app_id).collect();
        ids.sort_unstable();
        ids
    };
    app_ids(existing) != app_ids(desired)
}

fn sorted<T: Ord + Clone>(items: &[T]) -> Vec<T> {
    let mut items = items.to_vec();
    items.sort();
    items
}
