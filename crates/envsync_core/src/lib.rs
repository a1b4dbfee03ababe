//! Reconciliation of GitHub deployment environments.
//!
//! Given the environments declared for a repository, a reconciliation pass fetches the
//! environments that exist on GitHub, pairs them by name, works out which attribute groups
//! differ and issues the create, update and delete calls that make GitHub match the
//! declaration. In dry-run mode the same pass produces a report of planned changes instead.
//!
//! # Examples
//!
//! ```rust,no_run
//! use envsync_core::{sync, EnvironmentEntry, Environments, RepoRef, SyncContext};
//! use github_client::{create_token_client, GitHubClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GitHubClient::new(create_token_client("token", None)?);
//! let repo = RepoRef::new("my-org", "my-repo");
//! let ctx = SyncContext::new(&repo, &client, true);
//!
//! let plugin = Environments::new(Some(vec![EnvironmentEntry::new("production")]));
//! let outcome = sync(&plugin, &ctx).await?;
//! println!("{} planned changes", outcome.len());
//! # Ok(())
//! # }
//! ```

pub mod applier;
pub mod context;
pub mod differ;
pub mod environments;
pub mod errors;
pub mod fetcher;
pub mod model;
pub mod mutation;
pub mod nop_command;
pub mod normalizer;
pub mod reconciler;

#[cfg(test)]
mod mock_client;

pub use context::{ErrorSink, RepoRef, SyncContext, TracingErrorSink};
pub use differ::ChangeSet;
pub use environments::Environments;
pub use errors::{SyncError, SyncResult};
pub use model::{
    BranchPolicyName, CustomBranchPolicies, DeploymentBranchPolicy, DeploymentProtectionRule,
    EnvironmentEntry, EnvironmentState, Reviewer, Variable,
};
pub use mutation::Mutation;
pub use nop_command::{NopCommand, NopKind, PlannedChange};
pub use reconciler::{sync, Diffable, SyncOutcome};
