use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::message::MemoryMessage;

/// Per-consumer channel capacity used when none is configured.
pub const DEFAULT_CHANNEL_BUFFER: usize = 100;

/// Identifier of a consumer session within one queue.
pub type ConsumerId = u64;

pub(crate) type Delivery = Arc<MemoryMessage>;

/// Result of a publish attempt against one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Enqueued {
    /// Appended; `delivered` sessions took the live broadcast and `dropped`
    /// sessions had a full buffer.
    Accepted { delivered: usize, dropped: usize },
    Full,
}

/// A named FIFO backlog plus the consumer sessions attached to it.
///
/// Backlog and consumer set sit behind separate locks so publishers only hold
/// the consumer lock for the non-blocking broadcast.
#[derive(Debug)]
pub struct MemoryQueue {
    name: String,
    backlog: Mutex<VecDeque<Delivery>>,
    consumers: Mutex<HashMap<ConsumerId, flume::Sender<Delivery>>>,
    next_consumer: AtomicU64,
    max_size: usize,
    buffer_size: usize,
}

impl MemoryQueue {
    /// `max_size == 0` leaves the backlog unbounded; `buffer_size == 0` falls
    /// back to [`DEFAULT_CHANNEL_BUFFER`].
    pub fn new(name: impl Into<String>, max_size: usize, buffer_size: usize) -> Self {
        let buffer_size = if buffer_size == 0 {
            DEFAULT_CHANNEL_BUFFER
        } else {
            buffer_size
        };
        Self {
            name: name.into(),
            backlog: Mutex::new(VecDeque::new()),
            consumers: Mutex::new(HashMap::new()),
            next_consumer: AtomicU64::new(1),
            max_size,
            buffer_size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn len(&self) -> usize {
        self.backlog.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.backlog.lock().is_empty()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.lock().len()
    }

    /// Appends `msg` to the backlog and offers it to every live consumer
    /// without blocking.
    ///
    /// The broadcast runs under the backlog lock so it cannot interleave with
    /// [`MemoryQueue::attach`]: a new consumer gets each message either from
    /// the backlog drain or from the broadcast, never both.
    pub(crate) fn enqueue(&self, msg: Delivery) -> Enqueued {
        let mut backlog = self.backlog.lock();
        if self.max_size > 0 && backlog.len() >= self.max_size {
            return Enqueued::Full;
        }
        backlog.push_back(Arc::clone(&msg));

        let consumers = self.consumers.lock();
        let mut delivered = 0;
        let mut dropped = 0;
        for tx in consumers.values() {
            match tx.try_send(Arc::clone(&msg)) {
                Ok(()) => delivered += 1,
                Err(flume::TrySendError::Full(_)) => dropped += 1,
                // The pump is gone and will deregister itself.
                Err(flume::TrySendError::Disconnected(_)) => {}
            }
        }
        Enqueued::Accepted { delivered, dropped }
    }

    /// Registers a new consumer and hands it the current backlog in order.
    ///
    /// Stops at the first message the channel cannot take and leaves it and
    /// everything after it at the front of the backlog. Returns the consumer
    /// id, the pump side of its channel and how many messages were handed
    /// over.
    pub(crate) fn attach(&self) -> (ConsumerId, flume::Receiver<Delivery>, usize) {
        let (tx, rx) = flume::bounded(self.buffer_size);
        let id = self.next_consumer.fetch_add(1, Ordering::Relaxed);

        let mut backlog = self.backlog.lock();
        self.consumers.lock().insert(id, tx.clone());

        let mut handed = 0;
        while let Some(msg) = backlog.pop_front() {
            if let Err(e) = tx.try_send(msg) {
                backlog.push_front(e.into_inner());
                break;
            }
            handed += 1;
        }
        (id, rx, handed)
    }

    pub(crate) fn deregister(&self, id: ConsumerId) {
        self.consumers.lock().remove(&id);
    }

    /// Drops every consumer sender so each pump sees a disconnected channel.
    pub(crate) fn close_consumers(&self) {
        self.consumers.lock().clear();
    }

    /// Removes `msg` from the backlog by identity, if it is still there.
    pub(crate) fn remove(&self, msg: &Delivery) -> bool {
        let mut backlog = self.backlog.lock();
        match backlog.iter().position(|m| Arc::ptr_eq(m, msg)) {
            Some(pos) => {
                backlog.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Puts `msg` at the head of the backlog so it is delivered next.
    pub(crate) fn requeue_front(&self, msg: Delivery) {
        self.backlog.lock().push_front(msg);
    }

    pub(crate) fn purge(&self) -> usize {
        let mut backlog = self.backlog.lock();
        let n = backlog.len();
        backlog.clear();
        n
    }
}
