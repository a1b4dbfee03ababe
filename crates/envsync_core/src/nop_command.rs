//! Dry-run report entries.

use serde::Serialize;
use serde_json::Value;

use crate::{Mutation, RepoRef};

/// Severity of a dry-run report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NopKind {
    Info,
    Error,
}

/// One entry of a dry-run report: a change that would be made, or an error that stopped
/// planning for a resource.
///
/// # Examples
///
/// ```rust
/// use envsync_core::{Mutation, NopCommand, NopKind, PlannedChange, RepoRef};
///
/// let repo = RepoRef::new("my-org", "my-repo");
/// let change = Mutation::DeleteEnvironment { environment: "qa".to_string() };
///
/// let command = change.to_nop_command("Environments", &repo);
/// assert_eq!(command.kind, NopKind::Info);
/// assert_eq!(command.endpoint.as_deref(), Some("DELETE /repos/my-org/my-repo/environments/qa"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NopCommand {
    /// Resource kind that produced the entry
    pub plugin: String,

    pub repo: RepoRef,

    /// Method and path the change would be sent to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request body the change would send
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    pub action: String,

    #[serde(rename = "type")]
    pub kind: NopKind,
}

impl NopCommand {
    /// Creates an error entry.
    pub fn error(plugin: &str, repo: &RepoRef, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.to_string(),
            repo: repo.clone(),
            endpoint: None,
            body: None,
            action: message.into(),
            kind: NopKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NopKind::Error
    }
}

/// A change that can be reported in a dry-run.
pub trait PlannedChange {
    fn to_nop_command(&self, plugin: &str, repo: &RepoRef) -> NopCommand;
}

impl PlannedChange for Mutation {
    fn to_nop_command(&self, plugin: &str, repo: &RepoRef) -> NopCommand {
        let endpoint = match self.endpoint(repo) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                return NopCommand::error(
                    plugin,
                    repo,
                    format!("Failed to build the endpoint for '{}': {}", self.describe(), e),
                )
            }
        };

        NopCommand {
            plugin: plugin.to_string(),
            repo: repo.clone(),
            endpoint: Some(endpoint),
            body: self.body(),
            action: self.describe(),
            kind: NopKind::Info,
        }
    }
}
