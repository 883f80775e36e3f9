use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::memory::queue::MemoryQueue;

/// [`QueueRegistry`] is a thread-safe store of the queues owned by one broker.
///
/// Uses DashMap internally so lookups on different queues do not contend.
/// Queues are created lazily and seeded with the broker's limits.
#[derive(Debug)]
pub struct QueueRegistry {
    queues: DashMap<String, Arc<MemoryQueue>>,
    max_size: usize,
    buffer_size: usize,
}

impl QueueRegistry {
    /// Creates an empty registry whose queues use the given limits.
    pub fn new(max_size: usize, buffer_size: usize) -> Self {
        Self {
            queues: DashMap::new(),
            max_size,
            buffer_size,
        }
    }

    /// Attempts to get an existing queue by name.
    pub fn get(&self, name: &str) -> Option<Arc<MemoryQueue>> {
        self.queues.get(name).map(|entry| Arc::clone(&*entry))
    }

    /// Returns an existing queue or creates a new one if it doesn't exist.
    ///
    /// Concurrent first access for the same name always observes one instance.
    pub fn get_or_create(&self, name: &str) -> Arc<MemoryQueue> {
        if let Some(existing) = self.get(name) {
            return existing;
        }
        self.queues
            .entry(name.to_owned())
            .or_insert_with(|| {
                debug!(target: "mqkit::registry", queue = name, "queue not found; creating new");
                Arc::new(MemoryQueue::new(name, self.max_size, self.buffer_size))
            })
            .clone()
    }

    /// Lists all queue names currently registered.
    pub fn names(&self) -> Vec<String> {
        self.queues.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Removes `name` only while it still maps to `queue`.
    pub fn remove_if_same(&self, name: &str, queue: &Arc<MemoryQueue>) -> bool {
        self.queues
            .remove_if(name, |_, current| Arc::ptr_eq(current, queue))
            .is_some()
    }

    /// Removes and returns every queue.
    pub fn take_all(&self) -> Vec<Arc<MemoryQueue>> {
        let names = self.names();
        names
            .iter()
            .filter_map(|name| self.queues.remove(name).map(|(_, q)| q))
            .collect()
    }
}
