use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors produced while reconciling environments.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A GitHub API call failed, while fetching or while applying a change.
    #[error("GitHub API call failed: {0}")]
    GitHub(#[from] github_client::Error),

    /// GitHub reported the same variable name twice for one environment.
    ///
    /// Variable names are matched case-insensitively, so names that differ only in case
    /// collide as well.
    #[error("Environment '{environment}' reports variable '{name}' more than once")]
    DuplicateVariable { environment: String, name: String },

    /// A value could not be serialized for reporting.
    #[error("Failed to serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns `true` when the underlying GitHub call answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::GitHub(e) if e.is_not_found())
    }
}

/// Result alias for reconciliation operations.
pub type SyncResult<T> = Result<T, SyncError>;
