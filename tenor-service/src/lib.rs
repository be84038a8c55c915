//! Contracts for the service/listener/connector fabric.
//!
//! Every stage of the pipeline is a keyed service: it owns the
//! authoritative copy of one entity type, accepts mutations through
//! `on_message`, and notifies registered listeners synchronously, in
//! registration order, before the call returns. Listeners compose stages;
//! connectors adapt the boundary between the process and the outside world
//! (input files on the way in, append-only logs on the way out).

use std::collections::HashMap;
use std::hash::Hash;

/// Observer attached to a service. Only `process_add` carries traffic in
/// this system; remove/update are reserved.
pub trait ServiceListener<T> {
    /// Invoked once per accepted event, with a reference to the stored
    /// entity.
    fn process_add(&mut self, event: &T);

    /// Reserved for future deletes.
    fn process_remove(&mut self, _event: &T) {}

    /// Reserved for future partial updates.
    fn process_update(&mut self, _event: &T) {}
}

/// A keyed service owning the canonical copy of one entity type.
pub trait Service<K, T> {
    /// Last accepted entity for `key`, or a default-constructed entity when
    /// the key has never been seen.
    fn get_data(&self, key: &K) -> T;

    /// Ingest one entity: update the store, then publish to every listener.
    fn on_message(&mut self, event: T);

    /// Register a listener. Registration order defines dispatch order.
    fn add_listener(&mut self, listener: Box<dyn ServiceListener<T>>);

    /// Listeners in registration order.
    fn listeners(&self) -> &[Box<dyn ServiceListener<T>>];
}

/// Boundary adapter between the pipeline and the outside world.
///
/// Source connectors implement `subscribe` (drive the service's
/// `on_message` from an external feed until it is exhausted); sink
/// connectors implement `publish`. Each side defaults to a no-op so
/// one-directional adapters stay one-directional.
pub trait Connector<T> {
    /// Push one entity out of the process.
    fn publish(&mut self, _event: &T) -> anyhow::Result<()> {
        Ok(())
    }

    /// Pull the external feed into the owning service, to completion.
    fn subscribe(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Keyed store plus listener fan-out shared by every service.
///
/// `upsert_and_publish` is the single mutation path: it replaces the stored
/// entity for the key and dispatches the stored copy to each listener in
/// registration order before returning, which is what gives the pipeline
/// its depth-first, per-key-ordered delivery.
pub struct ServiceCore<K, T> {
    store: HashMap<K, T>,
    listeners: Vec<Box<dyn ServiceListener<T>>>,
}

impl<K, T> Default for ServiceCore<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> ServiceCore<K, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn ServiceListener<T>>) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn listeners(&self) -> &[Box<dyn ServiceListener<T>>] {
        &self.listeners
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<K: Eq + Hash + Clone, T> ServiceCore<K, T> {
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&T> {
        self.store.get(key)
    }

    /// Clone of the stored entity, or a default when absent.
    #[must_use]
    pub fn get_or_default(&self, key: &K) -> T
    where
        T: Clone + Default,
    {
        self.store.get(key).cloned().unwrap_or_default()
    }

    /// Store `value` under `key` (insert or replace) and notify every
    /// listener with the stored copy.
    pub fn upsert_and_publish(&mut self, key: K, value: T) {
        self.store.insert(key.clone(), value);
        if let Some(stored) = self.store.get(&key) {
            for listener in self.listeners.iter_mut() {
                listener.process_add(stored);
            }
        }
    }

}
