// ── Per-root status filter ──

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::client::StatusSet;
use crate::notify::{Subscribers, Subscription};

/// User-controlled set of allowed status values for one domain root.
///
/// An empty set is tolerated and matches nothing. Every mutation swaps the
/// whole set atomically and notifies subscribers once.
pub struct StateFilter {
    domain: &'static str,
    allowed: ArcSwap<StatusSet>,
    default: StatusSet,
    subscribers: Subscribers<StatusSet>,
}

impl StateFilter {
    /// Create a filter whose initial and reset value is `default`.
    pub fn new(domain: &'static str, default: StatusSet) -> Self {
        Self {
            domain,
            allowed: ArcSwap::from_pointee(default.clone()),
            default,
            subscribers: Subscribers::new(),
        }
    }

    /// Start from `initial` while keeping `default` for [`reset`](Self::reset).
    pub fn with_initial(domain: &'static str, default: StatusSet, initial: StatusSet) -> Self {
        let filter = Self::new(domain, default);
        filter.allowed.store(Arc::new(status_set(initial)));
        filter
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    pub fn allowed(&self) -> StatusSet {
        StatusSet::clone(&self.allowed.load())
    }

    pub fn default_set(&self) -> &StatusSet {
        &self.default
    }

    pub fn is_default(&self) -> bool {
        **self.allowed.load() == self.default
    }

    /// Replace the allowed set.
    pub fn set_allowed(&self, allowed: StatusSet) {
        self.allowed.store(Arc::new(status_set(allowed)));
        self.changed();
    }

    /// Add one state to the allowed set.
    pub fn allow(&self, state: &str) {
        let state = normalize(state);
        self.allowed.rcu(|current| {
            let mut next = StatusSet::clone(current);
            next.insert(state.clone());
            next
        });
        self.changed();
    }

    /// Remove one state from the allowed set.
    pub fn deny(&self, state: &str) {
        let state = normalize(state);
        self.allowed.rcu(|current| {
            let mut next = StatusSet::clone(current);
            next.remove(&state);
            next
        });
        self.changed();
    }

    /// Restore the domain default.
    pub fn reset(&self) {
        self.set_allowed(self.default.clone());
    }

    /// Whether a resource with `status` passes. Resources without a status
    /// never pass a status filter.
    pub fn matches(&self, status: Option<&str>) -> bool {
        status.is_some_and(|s| self.allowed.load().contains(&normalize(s)))
    }

    pub fn subscribe(&self, callback: impl Fn(&StatusSet) + Send + Sync + 'static) -> Subscription {
        self.subscribers.subscribe(callback)
    }

    fn changed(&self) {
        let allowed = self.allowed();
        debug!(domain = self.domain, ?allowed, "status filter changed");
        self.subscribers.notify(&allowed);
    }
}

impl std::fmt::Debug for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateFilter")
            .field("domain", &self.domain)
            .field("allowed", &self.allowed())
            .finish_non_exhaustive()
    }
}

/// Status values are compared upper-case (`running` == `RUNNING`).
pub fn normalize(state: &str) -> String {
    state.trim().to_ascii_uppercase()
}

/// Build a [`StatusSet`] from string-ish values, normalising each.
pub fn status_set<I, S>(states: I) -> StatusSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    states.into_iter().map(|s| normalize(s.as_ref())).collect()
}
