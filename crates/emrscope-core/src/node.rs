// ── Lazy hierarchy nodes ──
//
// Each node owns its cached children and fetches them on first demand.
// Validity is a stamp comparison: the cache is good iff it was filled
// under the current (coordinator generation, node epoch) pair.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

use crate::client::ResourceClient;
use crate::error::CoreError;
use crate::event::HierarchyEvent;
use crate::filter::StateFilter;
use crate::model::{ChildKind, ResourceDescriptor};
use crate::paginator::{Collected, Paginator};

const EVENT_CAPACITY: usize = 256;

/// State shared by every node of one coordinator.
pub(crate) struct Engine {
    generation: AtomicU64,
    events: broadcast::Sender<HierarchyEvent>,
    paginator: Paginator,
}

impl Engine {
    pub(crate) fn new(paginator: Paginator) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            generation: AtomicU64::new(0),
            events,
            paginator,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn paginator(&self) -> Paginator {
        self.paginator
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<HierarchyEvent> {
        self.events.subscribe()
    }

    /// Send without caring whether anyone is listening.
    pub(crate) fn emit(&self, event: HierarchyEvent) {
        let _ = self.events.send(event);
    }
}

// ── Node kinds and state ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A domain root; children are the domain's top-level resources.
    Root,
    /// A remote resource.
    Resource(ResourceDescriptor),
    /// Synthetic grouping of one child kind beneath a resource.
    Group {
        parent_id: String,
        kind: ChildKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Unpopulated,
    Populating,
    Populated,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    generation: u64,
    epoch: u64,
}

#[derive(Debug)]
struct CachedChildren {
    stamp: Stamp,
    children: Vec<Arc<HierarchyNode>>,
    truncated: bool,
    error: Option<CoreError>,
    fetched_at: DateTime<Utc>,
}

// ── HierarchyNode ───────────────────────────────────────────────────

/// One node in a lazily populated resource tree.
///
/// Parents own their children through the cache; a child only knows its
/// parent's id.
pub struct HierarchyNode {
    id: String,
    label: String,
    kind: NodeKind,
    root_id: String,
    parent_id: Option<String>,
    client: Arc<dyn ResourceClient>,
    filter: Option<Arc<StateFilter>>,
    engine: Arc<Engine>,
    epoch: AtomicU64,
    fetch_lock: Mutex<()>,
    cache: ArcSwapOption<CachedChildren>,
}

impl HierarchyNode {
    pub(crate) fn root(
        client: Arc<dyn ResourceClient>,
        filter: Option<Arc<StateFilter>>,
        engine: Arc<Engine>,
    ) -> Arc<Self> {
        let key = client.key().to_owned();
        Arc::new(Self {
            id: key.clone(),
            label: client.display_name().to_owned(),
            kind: NodeKind::Root,
            root_id: key,
            parent_id: None,
            client,
            filter,
            engine,
            epoch: AtomicU64::new(0),
            fetch_lock: Mutex::new(()),
            cache: ArcSwapOption::empty(),
        })
    }

    fn child(&self, id: String, label: String, kind: NodeKind) -> Arc<Self> {
        Arc::new(Self {
            id,
            label,
            kind,
            root_id: self.root_id.clone(),
            parent_id: Some(self.id.clone()),
            client: Arc::clone(&self.client),
            filter: None,
            engine: Arc::clone(&self.engine),
            epoch: AtomicU64::new(0),
            fetch_lock: Mutex::new(()),
            cache: ArcSwapOption::empty(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn domain(&self) -> &'static str {
        self.client.key()
    }

    /// The descriptor behind a resource node.
    pub fn descriptor(&self) -> Option<&ResourceDescriptor> {
        match &self.kind {
            NodeKind::Resource(descriptor) => Some(descriptor),
            NodeKind::Root | NodeKind::Group { .. } => None,
        }
    }

    /// The status filter, present on filterable roots only.
    pub fn filter(&self) -> Option<&Arc<StateFilter>> {
        self.filter.as_ref()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    /// Whether expanding this node can yield children.
    pub fn is_expandable(&self) -> bool {
        match &self.kind {
            NodeKind::Root | NodeKind::Group { .. } => true,
            NodeKind::Resource(descriptor) => !self.client.child_kinds(descriptor).is_empty(),
        }
    }

    pub fn state(&self) -> NodeState {
        if self.fetch_lock.try_lock().is_err() {
            return NodeState::Populating;
        }
        match self.cache.load().as_ref() {
            None => NodeState::Unpopulated,
            Some(cached) if cached.stamp == self.stamp() => NodeState::Populated,
            Some(_) => NodeState::Stale,
        }
    }

    /// Whether the last population hit the page cap.
    pub fn is_truncated(&self) -> bool {
        self.cache.load().as_ref().is_some_and(|c| c.truncated)
    }

    /// Failure recorded by the last population, if any.
    pub fn last_error(&self) -> Option<CoreError> {
        self.cache.load().as_ref().and_then(|c| c.error.clone())
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.cache.load().as_ref().map(|c| c.fetched_at)
    }

    /// Children currently cached, valid or not, without fetching.
    pub fn cached_children(&self) -> Vec<Arc<HierarchyNode>> {
        self.cache
            .load()
            .as_ref()
            .map(|c| c.children.clone())
            .unwrap_or_default()
    }

    fn stamp(&self) -> Stamp {
        Stamp {
            generation: self.engine.generation(),
            epoch: self.epoch.load(Ordering::Acquire),
        }
    }

    fn valid_children(&self) -> Option<Vec<Arc<HierarchyNode>>> {
        let cached = self.cache.load();
        let cached = cached.as_ref()?;
        (cached.stamp == self.stamp()).then(|| cached.children.clone())
    }

    /// Children of this node, fetching them if the cache is missing or stale.
    ///
    /// Concurrent callers share a single fetch. Remote failures never
    /// propagate: the node is populated with whatever was fetched and a
    /// `FetchFailed` event is emitted.
    pub async fn children(&self) -> Vec<Arc<HierarchyNode>> {
        if let Some(children) = self.valid_children() {
            debug!(node = %self.id, count = children.len(), "children cache hit");
            return children;
        }

        let _guard = self.fetch_lock.lock().await;
        if let Some(children) = self.valid_children() {
            debug!(node = %self.id, "children fetched by concurrent caller");
            return children;
        }

        let stamp = self.stamp();
        let previous = self.cache.load_full();
        debug!(node = %self.id, generation = stamp.generation, epoch = stamp.epoch, "populating children");

        let fetched = self.fetch(previous.as_deref()).await;
        let children = fetched.children.clone();
        self.cache.store(Some(Arc::new(CachedChildren {
            stamp,
            children: fetched.children,
            truncated: fetched.truncated,
            error: fetched.error,
            fetched_at: Utc::now(),
        })));
        children
    }

    /// Invalidate this node and every cached descendant.
    pub fn refresh(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some(cached) = self.cache.load().as_ref() {
            for child in &cached.children {
                child.refresh();
            }
        }
    }

    /// Invalidate this node only; descendants keep their caches.
    pub(crate) fn refresh_self(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    // ── Population ──────────────────────────────────────────────────

    async fn fetch(&self, previous: Option<&CachedChildren>) -> Fetched {
        let paginator = self.engine.paginator();
        match &self.kind {
            NodeKind::Root => {
                let allowed = self.filter.as_ref().map(|f| f.allowed());
                debug!(domain = self.client.key(), ?allowed, "listing top-level resources");
                let mut collected = paginator
                    .collect_roots(self.client.as_ref(), allowed.as_ref())
                    .await;
                if let Some(filter) = &self.filter {
                    collected
                        .items
                        .retain(|item| filter.matches(item.status.as_deref()));
                }
                self.finish(collected, "list", previous)
            }
            NodeKind::Resource(descriptor) => {
                let kinds = self.client.child_kinds(descriptor);
                match kinds.as_slice() {
                    [] => Fetched::default(),
                    [kind] => {
                        let collected = paginator
                            .collect_children(self.client.as_ref(), &descriptor.id, *kind)
                            .await;
                        self.finish(collected, "list_children", previous)
                    }
                    many => Fetched {
                        children: self.group_nodes(many, previous),
                        ..Fetched::default()
                    },
                }
            }
            NodeKind::Group { parent_id, kind } => {
                let collected = paginator
                    .collect_children(self.client.as_ref(), parent_id, *kind)
                    .await;
                self.finish(collected, "list_children", previous)
            }
        }
    }

    fn finish(
        &self,
        collected: Collected,
        fallback_operation: &str,
        previous: Option<&CachedChildren>,
    ) -> Fetched {
        if let Some(err) = &collected.error {
            self.report_failure(err, fallback_operation);
        }
        Fetched {
            children: self.resource_nodes(collected.items, previous),
            truncated: collected.truncated,
            error: collected.error,
        }
    }

    fn report_failure(&self, err: &CoreError, fallback_operation: &str) {
        let (domain, operation, message) = match err {
            CoreError::Remote {
                domain,
                operation,
                message,
            } => (domain.clone(), operation.clone(), message.clone()),
            other => (
                self.client.key().to_owned(),
                fallback_operation.to_owned(),
                other.to_string(),
            ),
        };
        debug!(node = %self.id, %domain, %operation, %message, "child fetch failed");
        self.engine.emit(HierarchyEvent::FetchFailed {
            node_id: self.id.clone(),
            domain,
            operation,
            message,
        });
    }

    /// Wrap descriptors as child nodes. Duplicate ids are dropped (first
    /// wins); children whose descriptor is unchanged are carried over.
    fn resource_nodes(
        &self,
        items: Vec<ResourceDescriptor>,
        previous: Option<&CachedChildren>,
    ) -> Vec<Arc<HierarchyNode>> {
        let reusable = reusable_by_id(previous);
        let mut seen = HashSet::with_capacity(items.len());
        let mut children = Vec::with_capacity(items.len());

        for item in items {
            if !seen.insert(item.id.clone()) {
                debug!(node = %self.id, child = %item.id, "dropping duplicate child");
                continue;
            }
            let reused = reusable
                .get(item.id.as_str())
                .filter(|old| old.descriptor() == Some(&item))
                .map(|old| Arc::clone(old));
            let node = reused.unwrap_or_else(|| {
                self.child(item.id.clone(), item.label(), NodeKind::Resource(item))
            });
            children.push(node);
        }
        children
    }

    fn group_nodes(
        &self,
        kinds: &[ChildKind],
        previous: Option<&CachedChildren>,
    ) -> Vec<Arc<HierarchyNode>> {
        let reusable = reusable_by_id(previous);
        let mut seen = HashSet::new();
        kinds
            .iter()
            .filter(|kind| seen.insert(kind.key))
            .map(|kind| {
                let id = format!("{}/{}", self.id, kind.key);
                match reusable.get(id.as_str()) {
                    Some(old) => Arc::clone(old),
                    None => self.child(
                        id,
                        kind.label.to_owned(),
                        NodeKind::Group {
                            parent_id: self.id.clone(),
                            kind: *kind,
                        },
                    ),
                }
            })
            .collect()
    }
}

fn reusable_by_id(previous: Option<&CachedChildren>) -> HashMap<&str, &Arc<HierarchyNode>> {
    previous
        .map(|p| p.children.iter().map(|c| (c.id(), c)).collect())
        .unwrap_or_default()
}

#[derive(Default)]
struct Fetched {
    children: Vec<Arc<HierarchyNode>>,
    truncated: bool,
    error: Option<CoreError>,
}

impl std::fmt::Debug for HierarchyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("root_id", &self.root_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
