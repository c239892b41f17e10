// Scripted in-memory resource domain shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use emrscope_core::{
    ChildKind, ContextState, CoreError, Explorer, Page, PageToken, ResourceClient,
    ResourceDescriptor, ResourceDetail, StatusSet, async_trait, status_set,
};

pub const STEPS: ChildKind = ChildKind::new("steps", "Steps");
pub const APPS: ChildKind = ChildKind::new("applications", "Apps");

type ListFn = dyn Fn(Option<PageToken>) -> Result<Page, CoreError> + Send + Sync;
type ChildrenFn = dyn Fn(&str, ChildKind, Option<PageToken>) -> Result<Page, CoreError> + Send + Sync;

pub struct FakeDomain {
    pub key: &'static str,
    pub default_filter: Option<StatusSet>,
    pub kinds: Vec<ChildKind>,
    pub delay: Option<Duration>,
    list_fn: Box<ListFn>,
    children_fn: Box<ChildrenFn>,
    pub list_calls: AtomicUsize,
    pub children_calls: AtomicUsize,
    pub seen_filters: Mutex<Vec<Option<StatusSet>>>,
}

impl FakeDomain {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            default_filter: None,
            kinds: Vec::new(),
            delay: None,
            list_fn: Box::new(|_| Ok(Page::default())),
            children_fn: Box::new(|_, _, _| Ok(Page::default())),
            list_calls: AtomicUsize::new(0),
            children_calls: AtomicUsize::new(0),
            seen_filters: Mutex::new(Vec::new()),
        }
    }

    pub fn filtered(mut self, states: &[&str]) -> Self {
        self.default_filter = Some(status_set(states.iter().copied()));
        self
    }

    pub fn kinds(mut self, kinds: &[ChildKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// A single final page with `items`.
    pub fn items(self, items: Vec<ResourceDescriptor>) -> Self {
        self.list(move |_| Ok(Page::last(items.clone())))
    }

    pub fn list(
        mut self,
        f: impl Fn(Option<PageToken>) -> Result<Page, CoreError> + Send + Sync + 'static,
    ) -> Self {
        self.list_fn = Box::new(f);
        self
    }

    pub fn children(
        mut self,
        f: impl Fn(&str, ChildKind, Option<PageToken>) -> Result<Page, CoreError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.children_fn = Box::new(f);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn children_calls(&self) -> usize {
        self.children_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceClient for FakeDomain {
    fn key(&self) -> &'static str {
        self.key
    }

    fn display_name(&self) -> &'static str {
        "Fake"
    }

    fn default_filter(&self) -> Option<StatusSet> {
        self.default_filter.clone()
    }

    fn child_kinds(&self, _resource: &ResourceDescriptor) -> Vec<ChildKind> {
        self.kinds.clone()
    }

    async fn list(
        &self,
        filter: Option<&StatusSet>,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_filters.lock().unwrap().push(filter.cloned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.list_fn)(token)
    }

    async fn describe(&self, id: &str) -> Result<Option<ResourceDetail>, CoreError> {
        Ok((id == "known").then(|| {
            ResourceDetail::new(ResourceDescriptor::new(id, "Known")).attr("release", Some("emr-7.1.0"))
        }))
    }

    async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        (self.children_fn)(parent_id, kind, token)
    }
}

pub fn resource(id: &str, status: &str) -> ResourceDescriptor {
    ResourceDescriptor::new(id, format!("name-{id}")).with_status(status)
}

pub fn numbered(prefix: &str, n: usize, status: &str) -> Vec<ResourceDescriptor> {
    (0..n).map(|i| resource(&format!("{prefix}-{i}"), status)).collect()
}

pub fn explorer(domains: Vec<Arc<FakeDomain>>) -> Explorer {
    explorer_with(Arc::new(ContextState::default()), domains, 100)
}

pub fn explorer_with(
    context: Arc<ContextState>,
    domains: Vec<Arc<FakeDomain>>,
    cap: usize,
) -> Explorer {
    Explorer::builder(context)
        .domains(domains.into_iter().map(|d| d as Arc<dyn ResourceClient>))
        .page_cap(cap)
        .build()
        .unwrap()
}

pub fn ids(nodes: &[Arc<emrscope_core::HierarchyNode>]) -> Vec<String> {
    nodes.iter().map(|n| n.id().to_owned()).collect()
}
