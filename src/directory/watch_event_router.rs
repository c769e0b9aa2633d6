use std::sync::{Arc, RwLock};

/// Called whenever the directory observes a meta file change (a commit).
pub type WatchCallback = Box<dyn Fn() + Sync + Send>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    callbacks: Vec<(u64, WatchCallback)>,
}

/// Registry of callbacks a `Directory` notifies on every `atomic_write` to
/// the meta file.
#[derive(Default, Clone)]
pub struct WatchCallbackList {
    inner: Arc<RwLock<Inner>>,
}

impl WatchCallbackList {
    /// Registers `callback`, returning a handle that removes it on drop.
    pub fn subscribe(&self, callback: WatchCallback) -> WatchHandle {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.callbacks.push((id, callback));
        WatchHandle { id, list: self.inner.clone() }
    }

    /// Invokes every still-registered callback.
    pub fn broadcast(&self) {
        let inner = self.inner.read().unwrap();
        for (_, cb) in &inner.callbacks {
            cb();
        }
    }
}

/// RAII handle: the registered callback is unregistered once this handle is
/// dropped.
pub struct WatchHandle {
    id: u64,
    list: Arc<RwLock<Inner>>,
}

impl WatchHandle {
    /// A handle with no backing registration, used where no unregistration
    /// is necessary (e.g. `ReloadPolicy::Manual`).
    pub fn empty() -> WatchHandle {
        WatchHandle { id: 0, list: Arc::new(RwLock::new(Inner::default())) }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        let mut inner = self.list.write().unwrap();
        inner.callbacks.retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_broadcast_calls_registered_callbacks() {
        let list = WatchCallbackList::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let _handle = list.subscribe(Box::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        list.broadcast();
        list.broadcast();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_unregisters_callback() {
        let list = WatchCallbackList::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        let handle = list.subscribe(Box::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        drop(handle);
        list.broadcast();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
