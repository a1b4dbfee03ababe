//! The immutable context handed to every reconciliation step.

use std::fmt;

use github_client::EnvironmentClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{Mutation, SyncResult};

/// Identifies the repository whose environments are reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Receives errors that end a run without failing it.
///
/// In normal mode a failed fetch is reported here and the run yields no changes.
pub trait ErrorSink: Send + Sync {
    fn log_error(&self, message: &str);
}

/// Reports errors through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn log_error(&self, message: &str) {
        error!("{}", message);
    }
}

static TRACING_ERROR_SINK: TracingErrorSink = TracingErrorSink;

/// Everything a reconciliation run needs besides the desired entries.
///
/// The context only borrows its collaborators, so one client can serve many runs.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    /// Repository being reconciled
    pub repo: &'a RepoRef,

    /// API used for reads in every mode and for writes outside dry-run mode
    pub client: &'a dyn EnvironmentClient,

    /// Dry-run: plan changes without sending them
    pub nop: bool,

    /// Where non-fatal errors are reported
    pub errors: &'a dyn ErrorSink,
}

impl<'a> SyncContext<'a> {
    /// Creates a context that reports errors through `tracing`.
    pub fn new(repo: &'a RepoRef, client: &'a dyn EnvironmentClient, nop: bool) -> Self {
        Self {
            repo,
            client,
            nop,
            errors: &TRACING_ERROR_SINK,
        }
    }

    /// Replaces the error sink.
    pub fn with_error_sink(mut self, errors: &'a dyn ErrorSink) -> Self {
        self.errors = errors;
        self
    }

    /// Sends a mutation to GitHub, or only records it in dry-run mode.
    ///
    /// Returns the mutation so callers can collect what was issued.
    pub async fn submit(&self, mutation: Mutation) -> SyncResult<Mutation> {
        if self.nop {
            debug!(
                repo = %self.repo,
                action = %mutation.describe(),
                "Dry run, not sending change"
            );
            return Ok(mutation);
        }

        mutation.execute(self.client, self.repo).await?;
        Ok(mutation)
    }
}

impl fmt::Debug for SyncContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("repo", &self.repo)
            .field("nop", &self.nop)
            .finish_non_exhaustive()
    }
}
