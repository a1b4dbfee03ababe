//! In-memory stand-in for GitHub's environment endpoints, shared by the unit tests.
//!
//! Writes change the stored state, so a second reconciliation run sees the result of the
//! first. Every call is recorded in order.

use async_trait::async_trait;
use github_client::{
    BranchPolicy, DeploymentBranchPolicySettings, DeploymentProtectionRule, Environment,
    EnvironmentClient, EnvironmentReviewer, EnvironmentUpdatePayload, EnvironmentVariable, Error,
    ProtectionRule, ProtectionRuleApp, ReviewerAccount, ReviewerType,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ListEnvironments,
    ListBranchPolicies(String),
    ListVariables(String),
    ListProtectionRules(String),
    PutEnvironment(String, EnvironmentUpdatePayload),
    DeleteEnvironment(String),
    CreateBranchPolicy(String, String),
    DeleteBranchPolicy(String, u64),
    CreateVariable(String, String, String),
    UpdateVariable(String, String, String),
    DeleteVariable(String, String),
    CreateProtectionRule(String, u64),
    DeleteProtectionRule(String, u64),
}

impl Call {
    pub(crate) fn is_write(&self) -> bool {
        !matches!(
            self,
            Call::ListEnvironments
                | Call::ListBranchPolicies(_)
                | Call::ListVariables(_)
                | Call::ListProtectionRules(_)
        )
    }
}

/// How `list_environments` should fail.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ListFailure {
    NotFound,
    RateLimited,
}

#[derive(Debug, Clone)]
pub(crate) struct MockEnvironment {
    pub environment: Environment,
    pub branch_policies: Vec<BranchPolicy>,
    pub variables: Vec<EnvironmentVariable>,
    pub protection_rules: Vec<DeploymentProtectionRule>,
}

impl MockEnvironment {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            environment: Environment {
                id: None,
                name: name.to_string(),
                protection_rules: Vec::new(),
                deployment_branch_policy: None,
            },
            branch_policies: Vec::new(),
            variables: Vec::new(),
            protection_rules: Vec::new(),
        }
    }

    pub(crate) fn with_wait_timer(mut self, wait_timer: u32) -> Self {
        self.environment
            .protection_rules
            .push(ProtectionRule::WaitTimer { wait_timer });
        self
    }

    pub(crate) fn with_reviewers(
        mut self,
        prevent_self_review: bool,
        reviewers: &[(u64, ReviewerType)],
    ) -> Self {
        self.environment
            .protection_rules
            .push(ProtectionRule::RequiredReviewers {
                prevent_self_review,
                reviewers: reviewers
                    .iter()
                    .map(|(id, reviewer_type)| reviewer(*id, *reviewer_type))
                    .collect(),
            });
        self
    }

    pub(crate) fn with_branch_policy(
        mut self,
        protected_branches: bool,
        custom_policies: Option<&[&str]>,
    ) -> Self {
        self.environment.deployment_branch_policy = Some(DeploymentBranchPolicySettings {
            protected_branches,
            custom_branch_policies: custom_policies.is_some(),
        });
        self.branch_policies = custom_policies
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, name)| BranchPolicy {
                id: 100 + i as u64,
                name: name.to_string(),
                policy_type: Some("branch".to_string()),
            })
            .collect();
        self
    }

    pub(crate) fn with_variable(mut self, name: &str, value: &str) -> Self {
        self.variables.push(EnvironmentVariable {
            name: name.to_string(),
            value: value.to_string(),
            created_at: None,
            updated_at: None,
        });
        self
    }

    pub(crate) fn with_protection_rule(mut self, id: u64, app_id: u64) -> Self {
        self.protection_rules.push(DeploymentProtectionRule {
            id,
            enabled: true,
            app: ProtectionRuleApp {
                id: app_id,
                slug: None,
            },
        });
        self
    }
}

fn reviewer(id: u64, reviewer_type: ReviewerType) -> EnvironmentReviewer {
    EnvironmentReviewer {
        reviewer_type,
        reviewer: ReviewerAccount {
            id,
            login: None,
            slug: None,
        },
    }
}

#[derive(Debug, Default)]
struct MockState {
    environments: Vec<MockEnvironment>,
    calls: Vec<Call>,
    next_id: u64,
}

impl MockState {
    fn find_mut(&mut self, name: &str) -> Result<&mut MockEnvironment, Error> {
        self.environments
            .iter_mut()
            .find(|e| e.environment.name.eq_ignore_ascii_case(name))
            .ok_or(Error::NotFound)
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockEnvironmentClient {
    state: Mutex<MockState>,
    list_failure: Option<ListFailure>,
    failing_environment: Option<String>,
}

impl MockEnvironmentClient {
    pub(crate) fn new(environments: Vec<MockEnvironment>) -> Self {
        Self {
            state: Mutex::new(MockState {
                environments,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub(crate) fn failing_list(failure: ListFailure) -> Self {
        Self {
            list_failure: Some(failure),
            ..Default::default()
        }
    }

    /// Makes every write to the named environment fail with a validation error.
    pub(crate) fn with_failing_writes(mut self, environment: &str) -> Self {
        self.failing_environment = Some(environment.to_string());
        self
    }

    pub(crate) async fn calls(&self) -> Vec<Call> {
        self.state.lock().await.calls.clone()
    }

    pub(crate) async fn writes(&self) -> Vec<Call> {
        self.calls()
            .await
            .into_iter()
            .filter(Call::is_write)
            .collect()
    }

    pub(crate) async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub(crate) async fn environment(&self, name: &str) -> Option<MockEnvironment> {
        self.state
            .lock()
            .await
            .environments
            .iter()
            .find(|e| e.environment.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn check_write(&self, environment: &str) -> Result<(), Error> {
        match &self.failing_environment {
            Some(failing) if failing.eq_ignore_ascii_case(environment) => Err(Error::ApiError {
                status: Some(422),
                message: "Validation Failed".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl EnvironmentClient for MockEnvironmentClient {
    async fn list_environments(&self, _owner: &str, _repo: &str) -> Result<Vec<Environment>, Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::ListEnvironments);
        match self.list_failure {
            Some(ListFailure::NotFound) => Err(Error::NotFound),
            Some(ListFailure::RateLimited) => Err(Error::RateLimitExceeded),
            None => Ok(state
                .environments
                .iter()
                .map(|e| e.environment.clone())
                .collect()),
        }
    }

    async fn create_or_update_environment(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        payload: &EnvironmentUpdatePayload,
    ) -> Result<Environment, Error> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(Call::PutEnvironment(environment.to_string(), payload.clone()));
        self.check_write(environment)?;

        if state.find_mut(environment).is_err() {
            state.environments.push(MockEnvironment::new(environment));
        }
        let existing = state.find_mut(environment)?;

        let mut rules = Vec::new();
        if payload.wait_timer > 0 {
            rules.push(ProtectionRule::WaitTimer {
                wait_timer: payload.wait_timer,
            });
        }
        if !payload.reviewers.is_empty() {
            rules.push(ProtectionRule::RequiredReviewers {
                prevent_self_review: payload.prevent_self_review,
                reviewers: payload
                    .reviewers
                    .iter()
                    .map(|r| reviewer(r.id, r.reviewer_type))
                    .collect(),
            });
        }
        existing.environment.protection_rules = rules;
        existing.environment.deployment_branch_policy = payload.deployment_branch_policy.clone();
        if !payload
            .deployment_branch_policy
            .as_ref()
            .is_some_and(|p| p.custom_branch_policies)
        {
            existing.branch_policies.clear();
        }

        Ok(existing.environment.clone())
    }

    async fn delete_environment(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(Call::DeleteEnvironment(environment.to_string()));
        self.check_write(environment)?;

        state
            .environments
            .retain(|e| !e.environment.name.eq_ignore_ascii_case(environment));
        Ok(())
    }

    async fn list_branch_policies(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
    ) -> Result<Vec<BranchPolicy>, Error> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(Call::ListBranchPolicies(environment.to_string()));
        Ok(state.find_mut(environment)?.branch_policies.clone())
    }

    async fn create_branch_policy(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<BranchPolicy, Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::CreateBranchPolicy(
            environment.to_string(),
            name.to_string(),
        ));
        self.check_write(environment)?;

        let id = state.next_id();
        let policy = BranchPolicy {
            id,
            name: name.to_string(),
            policy_type: Some("branch".to_string()),
        };
        state.find_mut(environment)?.branch_policies.push(policy.clone());
        Ok(policy)
    }

    async fn delete_branch_policy(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        branch_policy_id: u64,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::DeleteBranchPolicy(
            environment.to_string(),
            branch_policy_id,
        ));
        self.check_write(environment)?;

        state
            .find_mut(environment)?
            .branch_policies
            .retain(|p| p.id != branch_policy_id);
        Ok(())
    }

    async fn list_environment_variables(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
    ) -> Result<Vec<EnvironmentVariable>, Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::ListVariables(environment.to_string()));
        Ok(state.find_mut(environment)?.variables.clone())
    }

    async fn create_environment_variable(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::CreateVariable(
            environment.to_string(),
            name.to_string(),
            value.to_string(),
        ));
        self.check_write(environment)?;

        // GitHub reports variable names upper-cased.
        state.find_mut(environment)?.variables.push(EnvironmentVariable {
            name: name.to_uppercase(),
            value: value.to_string(),
            created_at: None,
            updated_at: None,
        });
        Ok(())
    }

    async fn update_environment_variable(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::UpdateVariable(
            environment.to_string(),
            name.to_string(),
            value.to_string(),
        ));
        self.check_write(environment)?;

        let variable = state
            .find_mut(environment)?
            .variables
            .iter_mut()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .ok_or(Error::NotFound)?;
        variable.value = value.to_string();
        Ok(())
    }

    async fn delete_environment_variable(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::DeleteVariable(
            environment.to_string(),
            name.to_string(),
        ));
        self.check_write(environment)?;

        state
            .find_mut(environment)?
            .variables
            .retain(|v| !v.name.eq_ignore_ascii_case(name));
        Ok(())
    }

    async fn list_deployment_protection_rules(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
    ) -> Result<Vec<DeploymentProtectionRule>, Error> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(Call::ListProtectionRules(environment.to_string()));
        Ok(state.find_mut(environment)?.protection_rules.clone())
    }

    async fn create_deployment_protection_rule(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        integration_id: u64,
    ) -> Result<DeploymentProtectionRule, Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::CreateProtectionRule(
            environment.to_string(),
            integration_id,
        ));
        self.check_write(environment)?;

        let id = state.next_id();
        let rule = DeploymentProtectionRule {
            id,
            enabled: true,
            app: ProtectionRuleApp {
                id: integration_id,
                slug: None,
            },
        };
        state.find_mut(environment)?.protection_rules.push(rule.clone());
        Ok(rule)
    }

    async fn delete_deployment_protection_rule(
        &self,
        _owner: &str,
        _repo: &str,
        environment: &str,
        rule_id: u64,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.calls.push(Call::DeleteProtectionRule(
            environment.to_string(),
            rule_id,
        ));
        self.check_write(environment)?;

        state
            .find_mut(environment)?
            .protection_rules
            .retain(|r| r.id != rule_id);
        Ok(())
    }
}
