//! The generic reconciliation pass.
//!
//! A resource kind plugs into [`sync`] by implementing [`Diffable`]: how to fetch existing
//! records, how to pair them with desired entries, when a pair differs and how to add,
//! update and remove one item. `sync` decides which of those to run and runs them
//! concurrently.

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{NopCommand, PlannedChange, SyncContext, SyncError, SyncResult};

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;

/// A resource kind that can be reconciled against GitHub.
#[async_trait]
pub trait Diffable: Send + Sync {
    /// Declared item.
    type Entry: Serialize + Send + Sync;

    /// Item as it currently exists on GitHub.
    type Record: Send + Sync;

    /// What an add, update or remove issues.
    type Change: PlannedChange + Send;

    /// Name used in reports and log messages.
    const NAME: &'static str;

    /// The declared items, or `None` if nothing is configured for this resource kind.
    fn entries(&self) -> Option<&[Self::Entry]>;

    async fn find(&self, ctx: &SyncContext<'_>) -> SyncResult<Vec<Self::Record>>;

    /// Whether an existing record and a desired entry describe the same item.
    fn comparator(&self, existing: &Self::Record, desired: &Self::Entry) -> bool;

    /// Whether a paired record must be updated to match its entry.
    fn changed(&self, existing: &Self::Record, desired: &Self::Entry) -> bool;

    async fn add(
        &self,
        ctx: &SyncContext<'_>,
        desired: &Self::Entry,
    ) -> SyncResult<Vec<Self::Change>>;

    async fn update(
        &self,
        ctx: &SyncContext<'_>,
        existing: &Self::Record,
        desired: &Self::Entry,
    ) -> SyncResult<Vec<Self::Change>>;

    async fn remove(
        &self,
        ctx: &SyncContext<'_>,
        existing: &Self::Record,
    ) -> SyncResult<Vec<Self::Change>>;
}

/// The result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome<C> {
    /// Changes sent to GitHub.
    Applied(Vec<C>),

    /// Dry-run report: planned changes plus errors.
    Planned(Vec<NopCommand>),

    /// Normal mode only: the existing state could not be fetched, so nothing was changed.
    /// The message has also gone to the context's error sink.
    FetchFailed(String),
}

impl<C> SyncOutcome<C> {
    fn empty(nop: bool) -> Self {
        if nop {
            SyncOutcome::Planned(Vec::new())
        } else {
            SyncOutcome::Applied(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SyncOutcome::Applied(changes) => changes.len(),
            SyncOutcome::Planned(commands) => commands.len(),
            SyncOutcome::FetchFailed(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the fetch failed or the dry-run report contains an error entry.
    pub fn has_errors(&self) -> bool {
        match self {
            SyncOutcome::Applied(_) => false,
            SyncOutcome::FetchFailed(_) => true,
            SyncOutcome::Planned(commands) => commands.iter().any(NopCommand::is_error),
        }
    }
}

/// Reconciles the declared entries of `plugin` with what exists on GitHub.
///
/// Existing records without a matching entry are removed, entries without a matching
/// record are added and pairs reported as changed are updated. All of these run
/// concurrently; the pass ends once every one of them has finished.
///
/// A failed fetch does not fail the pass. In dry-run mode a missing repository yields an
/// empty report and any other fetch error a single error entry; in normal mode the error
/// goes to the context's error sink, nothing is changed and the outcome is
/// [`SyncOutcome::FetchFailed`].
///
/// # Errors
///
/// In normal mode, the first failed add, update or remove (in scheduling order). In
/// dry-run mode operation failures become error entries instead.
pub async fn sync<D: Diffable>(
    plugin: &D,
    ctx: &SyncContext<'_>,
) -> SyncResult<SyncOutcome<D::Change>> {
    let Some(entries) = plugin.entries() else {
        debug!(repo = %ctx.repo, plugin = D::NAME, "Nothing configured, skipping");
        return Ok(SyncOutcome::empty(ctx.nop));
    };

    let existing = match plugin.find(ctx).await {
        Ok(existing) => existing,
        Err(e) => return fetch_failed::<D>(ctx, entries, e),
    };

    let mut operations: Vec<BoxFuture<'_, SyncResult<Vec<D::Change>>>> = Vec::new();
    let (mut removals, mut additions, mut updates) = (0, 0, 0);

    for record in &existing {
        if !entries.iter().any(|entry| plugin.comparator(record, entry)) {
            operations.push(plugin.remove(ctx, record));
            removals += 1;
        }
    }

    for entry in entries {
        match existing.iter().find(|record| plugin.comparator(record, entry)) {
            None => {
                operations.push(plugin.add(ctx, entry));
                additions += 1;
            }
            Some(record) if plugin.changed(record, entry) => {
                operations.push(plugin.update(ctx, record, entry));
                updates += 1;
            }
            Some(_) => {}
        }
    }

    info!(
        repo = %ctx.repo,
        plugin = D::NAME,
        dry_run = ctx.nop,
        additions,
        updates,
        removals,
        "Reconciling"
    );

    let results = join_all(operations).await;

    if ctx.nop {
        let commands = results
            .into_iter()
            .flat_map(|result| match result {
                Ok(changes) => changes
                    .iter()
                    .map(|change| change.to_nop_command(D::NAME, ctx.repo))
                    .collect::<Vec<_>>(),
                Err(e) => vec![NopCommand::error(
                    D::NAME,
                    ctx.repo,
                    format!("Error {} in {} for repo: {}", e, D::NAME, ctx.repo),
                )],
            })
            .collect();
        return Ok(SyncOutcome::Planned(commands));
    }

    let mut applied = Vec::new();
    for result in results {
        applied.extend(result?);
    }
    Ok(SyncOutcome::Applied(applied))
}

fn fetch_failed<D: Diffable>(
    ctx: &SyncContext<'_>,
    entries: &[D::Entry],
    error: SyncError,
) -> SyncResult<SyncOutcome<D::Change>> {
    if ctx.nop && error.is_not_found() {
        // The repository may not exist yet when only planning.
        debug!(repo = %ctx.repo, plugin = D::NAME, "Repository not found during dry run");
        return Ok(SyncOutcome::Planned(Vec::new()));
    }

    let message = format!(
        "Error {} in {} for repo: {} entries {}",
        error,
        D::NAME,
        serde_json::to_string(ctx.repo)?,
        serde_json::to_string(entries)?
    );
    warn!(repo = %ctx.repo, plugin = D::NAME, "Failed to fetch existing state");

    if ctx.nop {
        return Ok(SyncOutcome::Planned(vec![NopCommand::error(
            D::NAME,
            ctx.repo,
            message,
        )]));
    }

    ctx.errors.log_error(&message);
    Ok(SyncOutcome::FetchFailed(message))
}
