use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Weak,
};

use dashmap::DashMap;
use parking_lot::Mutex;

pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Registered<T> {
    key: u64,
    listener: Listener<T>,
}

/// Callbacks registered against one event source.
///
/// Listeners are cloned out before they run, so a listener may dispose its
/// own (or any other) subscription from inside the callback.
pub struct ListenerSet<T> {
    next_key: AtomicU64,
    listeners: Mutex<Vec<Registered<T>>>,
}

impl<T: Clone + Send + 'static> ListenerSet<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(ListenerSet {
            next_key: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn register(self: &Arc<Self>, listener: Listener<T>) -> Subscription {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Registered { key, listener });

        let set: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(set) = set.upgrade() {
                set.listeners.lock().retain(|r| r.key != key);
            }
        })
    }

    pub fn emit(&self, event: T) {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .lock()
            .iter()
            .map(|r| Arc::clone(&r.listener))
            .collect();

        for listener in listeners {
            listener(event.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Listener sets keyed by event source, such as a collection path or a uid.
/// A source is forgotten once its last subscription is disposed.
pub struct ListenerRegistry<T> {
    sets: Arc<DashMap<String, Arc<ListenerSet<T>>>>,
}

impl<T> Clone for ListenerRegistry<T> {
    fn clone(&self) -> Self {
        ListenerRegistry {
            sets: Arc::clone(&self.sets),
        }
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        ListenerRegistry {
            sets: Arc::new(DashMap::new()),
        }
    }
}

impl<T: Clone + Send + 'static> ListenerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: &str, listener: Listener<T>) -> Subscription {
        // Registered under the entry guard so a concurrent prune of the same
        // key cannot drop the set in between.
        let inner = {
            let entry = self.sets.entry(key.to_string()).or_insert_with(ListenerSet::new);
            entry.value().register(listener)
        };

        let sets = Arc::downgrade(&self.sets);
        let key = key.to_string();
        Subscription::new(move || {
            inner.dispose();
            if let Some(sets) = sets.upgrade() {
                sets.remove_if(&key, |_, set| set.is_empty());
            }
        })
    }

    /// Listeners of `key`, if anyone is subscribed.
    pub fn listeners(&self, key: &str) -> Option<Arc<ListenerSet<T>>> {
        self.sets
            .get(key)
            .map(|set| Arc::clone(set.value()))
            .filter(|set| !set.is_empty())
    }

    pub fn emit(&self, key: &str, event: T) {
        if let Some(set) = self.listeners(key) {
            set.emit(event);
        }
    }

    /// Number of sources with at least one live subscription.
    pub fn source_count(&self) -> usize {
        self.sets.len()
    }
}

/// Handle returned by every `subscribe`-style call. The callback stops being
/// invoked once the handle is disposed or dropped.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A handle with nothing to cancel.
    pub fn noop() -> Self {
        Subscription {
            cancel: Mutex::new(None),
        }
    }

    pub fn dispose(&self) {
        let cancel = self.cancel.lock().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.lock().is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
