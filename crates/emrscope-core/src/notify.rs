// ── Synchronous change fan-out ──
//
// Subscriber lists shared by `ContextState` and `StateFilter`. Callbacks
// are held weakly: the `Subscription` handle owns the only strong
// reference, so dropping it deregisters without an explicit call.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<T> = dyn Fn(&T) + Send + Sync;

/// Keep-alive handle for a registered callback.
///
/// The callback stays registered for as long as this value lives.
#[must_use = "dropping a Subscription deregisters its callback"]
pub struct Subscription {
    _callback: Box<dyn Any + Send + Sync>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

pub(crate) struct Subscribers<T: 'static> {
    entries: Mutex<Vec<Weak<Callback<T>>>>,
}

impl<T: 'static> Subscribers<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let callback: Arc<Callback<T>> = Arc::new(callback);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&callback));
        Subscription {
            _callback: Box::new(callback),
        }
    }

    /// Invoke every live callback once with `value`, pruning dead entries.
    ///
    /// The list lock is released before any callback runs, so callbacks
    /// may subscribe or drop subscriptions re-entrantly.
    pub(crate) fn notify(&self, value: &T) -> usize {
        let live: Vec<Arc<Callback<T>>> = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.retain(|weak| weak.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };

        for callback in &live {
            callback(value);
        }
        live.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
