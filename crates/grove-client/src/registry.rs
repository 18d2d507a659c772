//! Event-dispatch registry for watch notifications.
//!
//! Subscribers register a callback for a path and stay registered until they
//! call [`Subscription::unregister`]. Driver-level watches are one-shot, so a
//! subscriber that wants to keep observing must re-arm through the client;
//! the registry itself does not expire anything.

use crate::watch::WatchEvent;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Subscriber callback. Runs on the driver's dispatch thread.
pub type WatchCallback = Arc<dyn Fn(&WatchEvent) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    subscribers: DashMap<String, Vec<(u64, WatchCallback)>>,
    next_id: AtomicU64,
}

impl RegistryInner {
    fn unregister(&self, path: &str, id: u64) -> bool {
        let removed = match self.subscribers.get_mut(path) {
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|(entry_id, _)| *entry_id != id);
                entries.len() != before
            }
            None => false,
        };
        self.subscribers.remove_if(path, |_, entries| entries.is_empty());
        removed
    }
}

/// Concurrent path-to-callback registry.
#[derive(Clone, Default)]
pub struct WatchRegistry {
    inner: Arc<RegistryInner>,
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events on exactly `path`.
    pub fn register<F>(&self, path: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&WatchEvent) + Send + Sync + 'static,
    {
        let path = path.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .entry(path.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        trace!(path = %path, id, "Registered watch subscriber");

        Subscription {
            id,
            path,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every callback registered for the event's path.
    ///
    /// Callbacks are cloned out first and run without holding the map
    /// shard, so a callback may register or unregister. Returns how many
    /// callbacks ran.
    pub fn process(&self, event: &WatchEvent) -> usize {
        let callbacks: Vec<WatchCallback> = match self.inner.subscribers.get(&event.path) {
            Some(entries) => entries.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };

        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    /// Total live subscriptions across all paths.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .subscribers
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }

    /// Live subscriptions for one path.
    pub fn subscriptions_for(&self, path: &str) -> usize {
        self.inner
            .subscribers
            .get(path)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Drop every subscription and its callback.
    pub fn clear(&self) {
        let dropped = self.subscription_count();
        self.inner.subscribers.clear();
        debug!(dropped, "Cleared watch registry");
    }
}

impl fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("paths", &self.inner.subscribers.len())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Handle to a registered callback.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    path: String,
    registry: Weak<RegistryInner>,
}

impl Subscription {
    /// Registry-unique id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Path this subscription listens on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Remove the callback. Returns whether it was still registered;
    /// calling it again is harmless.
    pub fn unregister(&self) -> bool {
        let removed = self
            .registry
            .upgrade()
            .map(|inner| inner.unregister(&self.path, self.id))
            .unwrap_or(false);
        if removed {
            trace!(path = %self.path, id = self.id, "Unregistered watch subscriber");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::WatchEventKind;
    use std::sync::atomic::AtomicUsize;

    fn counter(registry: &WatchRegistry, path: &str) -> (Subscription, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&hits);
        let sub = registry.register(path, move |_: &WatchEvent| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        (sub, hits)
    }

    #[test]
    fn test_process_reaches_only_matching_path() {
        let registry = WatchRegistry::new();
        let (_a, hits_a) = counter(&registry, "/a");
        let (_b, hits_b) = counter(&registry, "/b");

        let invoked = registry.process(&WatchEvent::new(WatchEventKind::Deleted, "/a"));

        assert_eq!(invoked, 1);
        assert_eq!(hits_a.load(Ordering::SeqCst), 1);
        assert_eq!(hits_b.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = WatchRegistry::new();
        let (sub, hits) = counter(&registry, "/a");
        let (_other, _) = counter(&registry, "/a");
        assert_eq!(registry.subscription_count(), 2);

        assert!(sub.unregister());
        assert!(!sub.unregister());
        assert_eq!(registry.subscriptions_for("/a"), 1);

        registry.process(&WatchEvent::new(WatchEventKind::DataChanged, "/a"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_paths_are_pruned() {
        let registry = WatchRegistry::new();
        let (sub, _) = counter(&registry, "/a");
        sub.unregister();
        assert_eq!(registry.subscription_count(), 0);
        assert_eq!(format!("{:?}", registry), "WatchRegistry { paths: 0, subscriptions: 0 }");
    }

    #[test]
    fn test_callback_may_unregister_itself() {
        let registry = WatchRegistry::new();
        let slot: Arc<parking_lot::Mutex<Option<Subscription>>> = Arc::default();
        let inner_slot = Arc::clone(&slot);
        let sub = registry.register("/self", move |_: &WatchEvent| {
            if let Some(sub) = inner_slot.lock().take() {
                sub.unregister();
            }
        });
        *slot.lock() = Some(sub);

        registry.process(&WatchEvent::new(WatchEventKind::Deleted, "/self"));
        assert_eq!(registry.subscription_count(), 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let registry = WatchRegistry::new();
        let (sub, _) = counter(&registry, "/a");
        let (_b, _) = counter(&registry, "/b");

        registry.clear();
        assert_eq!(registry.subscription_count(), 0);
        assert!(!sub.unregister());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = WatchRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|j| registry.register(format!("/p{}", (i + j) % 5), |_: &WatchEvent| {}))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let subs: Vec<Subscription> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(registry.subscription_count(), 400);

        for sub in &subs {
            assert!(sub.unregister());
        }
        assert_eq!(registry.subscription_count(), 0);
    }
}
