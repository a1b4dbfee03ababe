//! Deployment environments as a reconcilable resource kind.

use async_trait::async_trait;

use crate::normalizer::normalize_entries;
use crate::reconciler::Diffable;
use crate::{applier, differ, fetcher};
use crate::{EnvironmentEntry, EnvironmentState, Mutation, SyncContext, SyncResult};

/// The environments declared for one repository.
///
/// Entries are normalized once, when the plugin is created.
///
/// # Examples
///
/// ```rust
/// use envsync_core::{EnvironmentEntry, Environments};
///
/// let plugin = Environments::new(Some(vec![EnvironmentEntry::new("Production")]));
/// assert_eq!(plugin.entries().unwrap()[0].name, "production");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Environments {
    entries: Option<Vec<EnvironmentEntry>>,
}

impl Environments {
    /// `None` means no environments are configured, and a pass does nothing. An empty list
    /// means every existing environment is deleted.
    pub fn new(entries: Option<Vec<EnvironmentEntry>>) -> Self {
        Self {
            entries: entries.map(normalize_entries),
        }
    }

    pub fn entries(&self) -> Option<&[EnvironmentEntry]> {
        self.entries.as_deref()
    }
}

#[async_trait]
impl Diffable for Environments {
    type Entry = EnvironmentEntry;
    type Record = EnvironmentState;
    type Change = Mutation;

    const NAME: &'static str = "Environments";

    fn entries(&self) -> Option<&[EnvironmentEntry]> {
        self.entries.as_deref()
    }

    async fn find(&self, ctx: &SyncContext<'_>) -> SyncResult<Vec<EnvironmentState>> {
        fetcher::find(ctx).await
    }

    fn comparator(&self, existing: &EnvironmentState, desired: &EnvironmentEntry) -> bool {
        differ::comparator(existing, desired)
    }

    fn changed(&self, existing: &EnvironmentState, desired: &EnvironmentEntry) -> bool {
        differ::changed(existing, desired)
    }

    async fn add(
        &self,
        ctx: &SyncContext<'_>,
        desired: &EnvironmentEntry,
    ) -> SyncResult<Vec<Mutation>> {
        applier::add(ctx, desired).await
    }

    async fn update(
        &self,
        ctx: &SyncContext<'_>,
        existing: &EnvironmentState,
        desired: &EnvironmentEntry,
    ) -> SyncResult<Vec<Mutation>> {
        applier::update(ctx, existing, desired).await
    }

    async fn remove(
        &self,
        ctx: &SyncContext<'_>,
        existing: &EnvironmentState,
    ) -> SyncResult<Vec<Mutation>> {
        applier::remove(ctx, existing).await
    }
}
