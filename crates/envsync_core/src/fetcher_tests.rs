use super::*;
use crate::mock_client::{Call, ListFailure, MockEnvironment, MockEnvironmentClient};
use crate::RepoRef;
use github_client::ReviewerType;

fn repo() -> RepoRef {
    RepoRef::new("my-org", "my-repo")
}

#[tokio::test]
async fn test_find_maps_protection_rules_and_defaults() {
    let client = MockEnvironmentClient::new(vec![
        MockEnvironment::new("Production")
            .with_wait_timer(30)
            .with_reviewers(true, &[(7, ReviewerType::Team), (3, ReviewerType::User)]),
        MockEnvironment::new("qa"),
    ]);
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, false);

    let environments = find(&ctx).await.unwrap();

    assert_eq!(environments.len(), 2);
    let production = &environments[0];
    assert_eq!(production.name, "production");
    assert_eq!(production.wait_timer, 30);
    assert!(production.prevent_self_review);
    assert_eq!(
        production.reviewers,
        vec![
            Reviewer {
                id: 7,
                reviewer_type: ReviewerType::Team
            },
            Reviewer {
                id: 3,
                reviewer_type: ReviewerType::User
            },
        ]
    );

    let qa = &environments[1];
    assert_eq!(qa.wait_timer, 0);
    assert!(!qa.prevent_self_review);
    assert!(qa.reviewers.is_empty());
    assert!(qa.deployment_branch_policy.is_none());
}

#[tokio::test]
async fn test_find_fetches_branch_policies_only_when_custom() {
    let client = MockEnvironmentClient::new(vec![
        MockEnvironment::new("protected").with_branch_policy(true, None),
        MockEnvironment::new("custom").with_branch_policy(false, Some(&["main", "release/*"])),
    ]);
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, false);

    let environments = find(&ctx).await.unwrap();

    assert_eq!(
        environments[0].deployment_branch_policy,
        Some(DeploymentBranchPolicy {
            protected_branches: true,
            custom_branch_policies: CustomBranchPolicies::Flag(false),
        })
    );
    assert_eq!(
        environments[1].deployment_branch_policy,
        Some(DeploymentBranchPolicy {
            protected_branches: false,
            custom_branch_policies: CustomBranchPolicies::Named(vec![
                BranchPolicyName {
                    name: "main".to_string()
                },
                BranchPolicyName {
                    name: "release/*".to_string()
                },
            ]),
        })
    );

    let calls = client.calls().await;
    assert!(!calls.contains(&Call::ListBranchPolicies("protected".to_string())));
    assert!(calls.contains(&Call::ListBranchPolicies("custom".to_string())));
}

#[tokio::test]
async fn test_find_uses_remote_name_for_sub_resources() {
    let client = MockEnvironmentClient::new(vec![MockEnvironment::new("Staging")]);
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, false);

    let environments = find(&ctx).await.unwrap();

    assert_eq!(environments[0].name, "staging");
    assert_eq!(
        client.calls().await,
        vec![
            Call::ListEnvironments,
            Call::ListVariables("Staging".to_string()),
            Call::ListProtectionRules("Staging".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_find_lowercases_variable_names() {
    let client = MockEnvironmentClient::new(vec![MockEnvironment::new("qa")
        .with_variable("REGION", "EU")
        .with_variable("LOG_LEVEL", "debug")]);
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, false);

    let environments = find(&ctx).await.unwrap();

    assert_eq!(
        environments[0].variables,
        vec![
            Variable {
                name: "region".to_string(),
                value: "EU".to_string()
            },
            Variable {
                name: "log_level".to_string(),
                value: "debug".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_find_maps_protection_rules_with_ids() {
    let client = MockEnvironmentClient::new(vec![MockEnvironment::new("qa")
        .with_protection_rule(300, 42)
        .with_protection_rule(301, 43)]);
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, false);

    let environments = find(&ctx).await.unwrap();

    assert_eq!(
        environments[0].deployment_protection_rules,
        vec![
            DeploymentProtectionRule {
                app_id: 42,
                id: Some(300)
            },
            DeploymentProtectionRule {
                app_id: 43,
                id: Some(301)
            },
        ]
    );
}

#[tokio::test]
async fn test_find_rejects_duplicate_variable_names() {
    let client = MockEnvironmentClient::new(vec![MockEnvironment::new("QA")
        .with_variable("REGION", "EU")
        .with_variable("region", "US")]);
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, false);

    let result = find(&ctx).await;

    match result {
        Err(SyncError::DuplicateVariable { environment, name }) => {
            assert_eq!(environment, "qa");
            assert_eq!(name, "region");
        }
        other => panic!("Expected DuplicateVariable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_find_propagates_not_found() {
    let client = MockEnvironmentClient::failing_list(ListFailure::NotFound);
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, false);

    let error = find(&ctx).await.unwrap_err();

    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_find_returns_empty_list_for_repository_without_environments() {
    let client = MockEnvironmentClient::new(Vec::new());
    let repo = repo();
    let ctx = SyncContext::new(&repo, &client, true);

    let environments = find(&ctx).await.unwrap();

    assert!(environments.is_empty());
}
