// ── Active region / profile context ──
//
// The single source of truth for "where" remote calls go. Domain
// sessions read it at call time, and the refresh coordinator subscribes
// to it so every hierarchy goes stale when it changes.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use crate::notify::{Subscribers, Subscription};

/// Region used when neither a selection nor an environment default exists.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Point-in-time view of the context, handed to subscribers.
///
/// `version` increases by exactly one per `set_*` call. Subscribers should
/// treat a notification as "state changed" and re-read what they need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    pub region: String,
    pub profile: Option<String>,
    pub version: u64,
}

/// Fallback values resolved from the environment or configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextDefaults {
    pub region: Option<String>,
    pub profile: Option<String>,
}

impl ContextDefaults {
    /// Read `AWS_REGION` / `AWS_DEFAULT_REGION` and `AWS_PROFILE`.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            region: non_empty("AWS_REGION").or_else(|| non_empty("AWS_DEFAULT_REGION")),
            profile: non_empty("AWS_PROFILE"),
        }
    }

    /// Layer `self` over `fallback`: values present here win.
    pub fn or(self, fallback: ContextDefaults) -> Self {
        Self {
            region: self.region.or(fallback.region),
            profile: self.profile.or(fallback.profile),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Selection {
    region: Option<String>,
    profile: Option<String>,
    version: u64,
}

/// Holds the active region and credential profile.
///
/// Reads are lock-free (`ArcSwap`); every mutation is a single atomic
/// swap followed by a synchronous fan-out to subscribers.
pub struct ContextState {
    selection: ArcSwap<Selection>,
    defaults: ContextDefaults,
    subscribers: Subscribers<ContextSnapshot>,
    watch_tx: watch::Sender<ContextSnapshot>,
}

impl ContextState {
    pub fn new(defaults: ContextDefaults) -> Self {
        let selection = Selection::default();
        let initial = snapshot_of(&selection, &defaults);
        let (watch_tx, _) = watch::channel(initial);

        Self {
            selection: ArcSwap::from_pointee(selection),
            defaults,
            subscribers: Subscribers::new(),
            watch_tx,
        }
    }

    /// Context seeded from the process environment.
    pub fn from_env() -> Self {
        Self::new(ContextDefaults::from_env())
    }

    /// Active region: selection, then environment default, then [`DEFAULT_REGION`].
    pub fn region(&self) -> String {
        resolve_region(&self.selection.load(), &self.defaults)
    }

    /// Active profile, if any.
    pub fn profile(&self) -> Option<String> {
        resolve_profile(&self.selection.load(), &self.defaults)
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        snapshot_of(&self.selection.load(), &self.defaults)
    }

    pub fn defaults(&self) -> &ContextDefaults {
        &self.defaults
    }

    /// Select a region. Notifies subscribers even if the value is unchanged.
    pub fn set_region(&self, region: impl Into<String>) {
        let region = region.into();
        self.update(|sel| sel.region = Some(region.clone()));
    }

    /// Select a profile (`None` falls back to the environment default).
    pub fn set_profile(&self, profile: Option<String>) {
        self.update(|sel| sel.profile.clone_from(&profile));
    }

    /// Register a synchronous change callback.
    pub fn subscribe(
        &self,
        callback: impl Fn(&ContextSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribers.subscribe(callback)
    }

    /// Async, level-triggered view of the context.
    pub fn watch(&self) -> watch::Receiver<ContextSnapshot> {
        self.watch_tx.subscribe()
    }

    /// Stream of snapshots, starting with the current one.
    pub fn changes(&self) -> WatchStream<ContextSnapshot> {
        WatchStream::new(self.watch())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn update(&self, apply: impl Fn(&mut Selection)) {
        self.selection.rcu(|current| {
            let mut next = Selection::clone(current);
            apply(&mut next);
            next.version += 1;
            Arc::new(next)
        });

        let snapshot = self.snapshot();
        info!(
            region = %snapshot.region,
            profile = snapshot.profile.as_deref().unwrap_or("<default>"),
            version = snapshot.version,
            "context changed"
        );

        self.watch_tx.send_replace(snapshot.clone());
        self.subscribers.notify(&snapshot);
    }
}

impl Default for ContextState {
    fn default() -> Self {
        Self::new(ContextDefaults::default())
    }
}

impl std::fmt::Debug for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextState")
            .field("snapshot", &self.snapshot())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

fn resolve_region(selection: &Selection, defaults: &ContextDefaults) -> String {
    selection
        .region
        .clone()
        .or_else(|| defaults.region.clone())
        .unwrap_or_else(|| DEFAULT_REGION.to_owned())
}

fn resolve_profile(selection: &Selection, defaults: &ContextDefaults) -> Option<String> {
    selection.profile.clone().or_else(|| defaults.profile.clone())
}

fn snapshot_of(selection: &Selection, defaults: &ContextDefaults) -> ContextSnapshot {
    ContextSnapshot {
        region: resolve_region(selection, defaults),
        profile: resolve_profile(selection, defaults),
        version: selection.version,
    }
}
