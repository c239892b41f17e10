// ── Refresh coordination ──
//
// Owns the global generation counter and the event channel. Context
// changes bump the generation (every root goes stale at once); filter
// changes bump only the owning root's epoch.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use indexmap::IndexMap;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::client::ResourceClient;
use crate::context::ContextState;
use crate::event::HierarchyEvent;
use crate::filter::StateFilter;
use crate::node::{Engine, HierarchyNode};
use crate::notify::Subscription;
use crate::paginator::Paginator;

struct RegisteredRoot {
    node: Arc<HierarchyNode>,
    _filter_subscription: Option<Subscription>,
}

/// Invalidates registered roots and tells observers about it.
pub struct RefreshCoordinator {
    engine: Arc<Engine>,
    roots: Mutex<IndexMap<String, RegisteredRoot>>,
    context_subscription: Mutex<Option<Subscription>>,
}

impl RefreshCoordinator {
    pub fn new(paginator: Paginator) -> Arc<Self> {
        Arc::new(Self {
            engine: Arc::new(Engine::new(paginator)),
            roots: Mutex::new(IndexMap::new()),
            context_subscription: Mutex::new(None),
        })
    }

    /// Refresh everything whenever `context` changes. Replaces any
    /// previously attached context.
    pub fn attach(self: &Arc<Self>, context: &ContextState) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let subscription = context.subscribe(move |snapshot| {
            if let Some(coordinator) = weak.upgrade() {
                debug!(version = snapshot.version, "context change; invalidating roots");
                coordinator.refresh_all();
            }
        });
        *self
            .context_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    /// Build an unregistered root node bound to this coordinator.
    pub fn new_root(
        &self,
        client: Arc<dyn ResourceClient>,
        filter: Option<Arc<StateFilter>>,
    ) -> Arc<HierarchyNode> {
        HierarchyNode::root(client, filter, Arc::clone(&self.engine))
    }

    /// Track `node` for global refreshes, and for filter changes if it has
    /// a filter. Re-registering an id replaces the earlier root.
    pub fn register_root(&self, node: Arc<HierarchyNode>) {
        let filter_subscription = node.filter().map(|filter| {
            let weak_node = Arc::downgrade(&node);
            let engine = Arc::downgrade(&self.engine);
            filter.subscribe(move |_| {
                let (Some(node), Some(engine)) = (weak_node.upgrade(), engine.upgrade()) else {
                    return;
                };
                node.refresh_self();
                engine.emit(HierarchyEvent::Changed {
                    root_id: node.id().to_owned(),
                });
            })
        });

        debug!(root = node.id(), "registering root");
        self.lock_roots().insert(
            node.id().to_owned(),
            RegisteredRoot {
                node,
                _filter_subscription: filter_subscription,
            },
        );
    }

    pub fn unregister_root(&self, id: &str) -> Option<Arc<HierarchyNode>> {
        self.lock_roots().shift_remove(id).map(|r| r.node)
    }

    /// Registered roots in registration order.
    pub fn roots(&self) -> Vec<Arc<HierarchyNode>> {
        self.lock_roots().values().map(|r| Arc::clone(&r.node)).collect()
    }

    pub fn root(&self, id: &str) -> Option<Arc<HierarchyNode>> {
        self.lock_roots().get(id).map(|r| Arc::clone(&r.node))
    }

    /// Invalidate every root and emit one `Changed` per root.
    pub fn refresh_all(&self) {
        let generation = self.engine.bump_generation();
        let ids: Vec<String> = self.lock_roots().keys().cloned().collect();
        info!(generation, roots = ids.len(), "refreshing all roots");
        for root_id in ids {
            self.engine.emit(HierarchyEvent::Changed { root_id });
        }
    }

    /// Invalidate `node` and its cached subtree.
    pub fn refresh_node(&self, node: &HierarchyNode) {
        debug!(node = node.id(), "refreshing subtree");
        node.refresh();
        self.engine.emit(HierarchyEvent::Changed {
            root_id: node.root_id().to_owned(),
        });
    }

    pub fn generation(&self) -> u64 {
        self.engine.generation()
    }

    pub fn events(&self) -> broadcast::Receiver<HierarchyEvent> {
        self.engine.subscribe()
    }

    fn lock_roots(&self) -> std::sync::MutexGuard<'_, IndexMap<String, RegisteredRoot>> {
        self.roots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("generation", &self.generation())
            .field("roots", &self.lock_roots().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
