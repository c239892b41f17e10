// ── Resource client abstraction ──
//
// One implementation per resource domain. The hierarchy engine depends
// only on this trait; concrete domains own their SDK calls.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{ChildKind, Page, PageToken, ResourceDescriptor, ResourceDetail};

/// Set of allowed status values passed to a root listing.
pub type StatusSet = BTreeSet<String>;

/// Capability set every resource domain provides.
///
/// Implementations must resolve region and credentials at call time so a
/// context change affects the very next call.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Stable domain key (e.g. `emr-ec2`). Also the root node id.
    fn key(&self) -> &'static str;

    /// Human name for the domain root (e.g. "EMR on EC2").
    fn display_name(&self) -> &'static str;

    /// Status filter applied to a fresh root. `None` means the domain is
    /// not status-filterable.
    fn default_filter(&self) -> Option<StatusSet> {
        None
    }

    /// Status values the domain can report for top-level resources.
    fn known_states(&self) -> &'static [&'static str] {
        &[]
    }

    /// Sub-resource kinds beneath `resource`. Empty means leaf.
    fn child_kinds(&self, resource: &ResourceDescriptor) -> Vec<ChildKind>;

    /// One page of top-level resources.
    async fn list(
        &self,
        filter: Option<&StatusSet>,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError>;

    /// Detail for one top-level resource; `Ok(None)` if it no longer exists.
    async fn describe(&self, id: &str) -> Result<Option<ResourceDetail>, CoreError>;

    /// One page of `kind` children beneath `parent_id`.
    async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError>;
}
