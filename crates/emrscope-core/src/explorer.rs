// ── Explorer facade ──
//
// What a host talks to: one root per registered domain, expansion,
// path resolution, refresh and filter access.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::client::{ResourceClient, StatusSet};
use crate::context::ContextState;
use crate::coordinator::RefreshCoordinator;
use crate::error::CoreError;
use crate::event::HierarchyEvent;
use crate::filter::StateFilter;
use crate::model::ResourceDetail;
use crate::node::HierarchyNode;
use crate::paginator::{DEFAULT_PAGE_CAP, Paginator};

/// Builder for [`Explorer`].
pub struct ExplorerBuilder {
    context: Arc<ContextState>,
    domains: Vec<Arc<dyn ResourceClient>>,
    page_cap: usize,
    filters: HashMap<String, StatusSet>,
}

impl ExplorerBuilder {
    /// Register a resource domain. Order of registration is root order.
    pub fn domain(mut self, client: Arc<dyn ResourceClient>) -> Self {
        self.domains.push(client);
        self
    }

    pub fn domains(mut self, clients: impl IntoIterator<Item = Arc<dyn ResourceClient>>) -> Self {
        self.domains.extend(clients);
        self
    }

    pub fn page_cap(mut self, cap: usize) -> Self {
        self.page_cap = cap;
        self
    }

    /// Start `domain`'s filter from `allowed` instead of its default.
    pub fn filter(mut self, domain: impl Into<String>, allowed: StatusSet) -> Self {
        self.filters.insert(domain.into(), allowed);
        self
    }

    pub fn build(mut self) -> Result<Explorer, CoreError> {
        let coordinator = RefreshCoordinator::new(Paginator::new(self.page_cap));
        coordinator.attach(&self.context);

        let mut clients: IndexMap<&'static str, Arc<dyn ResourceClient>> = IndexMap::new();
        for client in self.domains {
            let key = client.key();
            if clients.contains_key(key) {
                return Err(CoreError::Config {
                    message: format!("domain '{key}' registered twice"),
                });
            }

            let filter = client.default_filter().map(|default| {
                let filter = match self.filters.remove(key) {
                    Some(initial) => StateFilter::with_initial(key, default, initial),
                    None => StateFilter::new(key, default),
                };
                Arc::new(filter)
            });

            debug!(domain = key, filterable = filter.is_some(), "registering domain");
            let root = coordinator.new_root(Arc::clone(&client), filter);
            coordinator.register_root(root);
            clients.insert(key, client);
        }

        for key in self.filters.keys() {
            warn!(domain = %key, "ignoring filter for unknown or unfilterable domain");
        }

        Ok(Explorer {
            context: self.context,
            coordinator,
            clients,
        })
    }
}

/// Entry point for hosts browsing resource hierarchies.
pub struct Explorer {
    context: Arc<ContextState>,
    coordinator: Arc<RefreshCoordinator>,
    clients: IndexMap<&'static str, Arc<dyn ResourceClient>>,
}

impl Explorer {
    pub fn builder(context: Arc<ContextState>) -> ExplorerBuilder {
        ExplorerBuilder {
            context,
            domains: Vec::new(),
            page_cap: DEFAULT_PAGE_CAP,
            filters: HashMap::new(),
        }
    }

    pub fn context(&self) -> &Arc<ContextState> {
        &self.context
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Registered domain clients, in root order.
    pub fn domains(&self) -> impl Iterator<Item = &Arc<dyn ResourceClient>> {
        self.clients.values()
    }

    pub fn roots(&self) -> Vec<Arc<HierarchyNode>> {
        self.coordinator.roots()
    }

    pub fn root(&self, key: &str) -> Result<Arc<HierarchyNode>, CoreError> {
        self.coordinator
            .root(key)
            .ok_or_else(|| CoreError::UnknownDomain { key: key.to_owned() })
    }

    pub async fn expand(&self, node: &HierarchyNode) -> Vec<Arc<HierarchyNode>> {
        node.children().await
    }

    /// Walk from a domain root down a path of segments.
    ///
    /// The first segment is the domain key. Each later segment matches a
    /// child by id first, then by name or label.
    pub async fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Result<Arc<HierarchyNode>, CoreError> {
        let Some((first, rest)) = path.split_first() else {
            return Err(CoreError::UnknownDomain { key: String::new() });
        };

        let mut node = self.root(first.as_ref())?;
        for segment in rest {
            let segment = segment.as_ref();
            let children = node.children().await;
            let found = children
                .iter()
                .find(|child| child.id() == segment)
                .or_else(|| {
                    children.iter().find(|child| {
                        child.label() == segment
                            || child.descriptor().is_some_and(|d| d.name == segment)
                            || child.id().rsplit('/').next() == Some(segment)
                    })
                })
                .cloned();
            node = found.ok_or_else(|| CoreError::NodeNotFound {
                parent: node.id().to_owned(),
                segment: segment.to_owned(),
            })?;
        }
        Ok(node)
    }

    /// Detail for a top-level resource of `root_key`.
    pub async fn describe(&self, root_key: &str, id: &str) -> Result<Option<ResourceDetail>, CoreError> {
        let client = self
            .clients
            .get(root_key)
            .ok_or_else(|| CoreError::UnknownDomain { key: root_key.to_owned() })?;
        client.describe(id).await
    }

    pub fn refresh(&self, node: &HierarchyNode) {
        self.coordinator.refresh_node(node);
    }

    pub fn refresh_all(&self) {
        self.coordinator.refresh_all();
    }

    /// The status filter of a root; `None` for unknown or unfilterable domains.
    pub fn filter(&self, root_key: &str) -> Option<Arc<StateFilter>> {
        self.coordinator
            .root(root_key)
            .and_then(|root| root.filter().cloned())
    }

    pub fn events(&self) -> broadcast::Receiver<HierarchyEvent> {
        self.coordinator.events()
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("context", &self.context)
            .field("domains", &self.clients.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
