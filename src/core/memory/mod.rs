//! In-process message broker.
//!
//! Every publish is appended to the queue's backlog *and* offered to every
//! live consumer. A subscriber therefore sees messages published while it is
//! attached, plus whatever is still in the backlog when it attaches. One
//! message can reach several consumers this way; that hybrid of work-queue and
//! pub/sub delivery is intentional and is kept as is.

pub mod queue;
pub mod registry;
mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::core::error::{validate_queue, MqError, Result};
use crate::core::manager::{MessageHandler, MessageQueueManager, Subscription};
use crate::core::message::{downcast_memory, MemoryMessage, MessageRef};
use crate::core::observe::{MetricsSink, Recorder};
use crate::core::options::{PublishOptions, SubscribeOptions};

pub use queue::{MemoryQueue, DEFAULT_CHANNEL_BUFFER};
pub use registry::QueueRegistry;

use queue::Enqueued;
use session::ConsumerSession;

/// Driver label reported to the observability boundary.
pub const DRIVER: &str = "memory";

const MANAGER_NAME: &str = "memory_mq_manager";

/// In-process [`MessageQueueManager`].
///
/// Cloning is cheap and every clone drives the same queues. The queue registry
/// belongs to this instance, so independent managers never share state.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    registry: QueueRegistry,
    recorder: Recorder,
    closed: AtomicBool,
}

impl Inner {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MqError::ManagerClosed);
        }
        Ok(())
    }

    /// Tears down a queue created after close() already swept the registry.
    fn discard(&self, name: &str, queue: &Arc<MemoryQueue>) {
        self.registry.remove_if_same(name, queue);
        queue.close_consumers();
        queue.purge();
    }
}

impl MemoryManager {
    /// `max_queue_size == 0` leaves queues unbounded; `channel_buffer == 0`
    /// uses [`DEFAULT_CHANNEL_BUFFER`].
    pub fn new(max_queue_size: usize, channel_buffer: usize) -> Self {
        Self::with_sink(max_queue_size, channel_buffer, None)
    }

    pub fn with_sink(max_queue_size: usize, channel_buffer: usize, sink: Option<Arc<dyn MetricsSink>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: QueueRegistry::new(max_queue_size, channel_buffer),
                recorder: Recorder::new(sink),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn from_config(config: &MemoryConfig, sink: Option<Arc<dyn MetricsSink>>) -> Self {
        Self::with_sink(config.max_queue_size, config.channel_buffer, sink)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of queues created so far.
    pub fn queue_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of live consumer sessions attached to `queue`.
    pub fn consumer_count(&self, queue: &str) -> usize {
        self.inner
            .registry
            .get(queue)
            .map_or(0, |q| q.consumer_count())
    }
}

#[async_trait]
impl MessageQueueManager for MemoryManager {
    fn manager_name(&self) -> &str {
        MANAGER_NAME
    }

    fn health(&self) -> Result<()> {
        self.inner.ensure_open()
    }

    async fn on_start(&self) -> Result<()> {
        Ok(())
    }

    async fn on_stop(&self) -> Result<()> {
        self.close().await
    }

    async fn publish(
        &self,
        _ctx: &CancellationToken,
        queue: &str,
        body: Bytes,
        opts: PublishOptions,
    ) -> Result<()> {
        let inner = &self.inner;
        inner.recorder.record(DRIVER, "publish", queue, || {
            validate_queue(queue)?;
            inner.ensure_open()?;

            let q = inner.registry.get_or_create(queue);
            let msg = Arc::new(MemoryMessage::new(queue, body, opts.headers));
            let outcome = q.enqueue(msg);
            // Lost a race with close(): drop the queue this call may have recreated.
            if let Err(e) = inner.ensure_open() {
                inner.discard(queue, &q);
                return Err(e);
            }

            match outcome {
                Enqueued::Full => Err(MqError::QueueFull(queue.to_owned())),
                Enqueued::Accepted { dropped, .. } => {
                    inner.recorder.publish(DRIVER);
                    for _ in 0..dropped {
                        inner.recorder.dropped(DRIVER, queue);
                    }
                    Ok(())
                }
            }
        })
    }

    async fn subscribe(
        &self,
        ctx: &CancellationToken,
        queue: &str,
        opts: SubscribeOptions,
    ) -> Result<Subscription> {
        let inner = &self.inner;
        inner.recorder.record(DRIVER, "subscribe", queue, || {
            validate_queue(queue)?;
            inner.ensure_open()?;

            let q = inner.registry.get_or_create(queue);
            let (id, rx, drained) = q.attach();
            // Lost a race with close(): the queue is no longer in the registry.
            if let Err(e) = inner.ensure_open() {
                q.deregister(id);
                inner.discard(queue, &q);
                return Err(e);
            }
            let (out_tx, out_rx) = flume::bounded(q.buffer_size());

            ConsumerSession {
                id,
                queue: Arc::clone(&q),
                inbox: rx,
                outbox: out_tx,
                ctx: ctx.clone(),
                auto_ack: opts.auto_ack,
                recorder: inner.recorder.clone(),
            }
            .spawn();

            debug!(target: "mqkit::memory", queue, consumer = id, drained, auto_ack = opts.auto_ack, "subscribed");
            Ok(Subscription::new(out_rx))
        })
    }

    async fn subscribe_with_callback(
        &self,
        ctx: &CancellationToken,
        queue: &str,
        handler: Option<Arc<dyn MessageHandler>>,
        opts: SubscribeOptions,
    ) -> Result<()> {
        let sub = self.subscribe(ctx, queue, opts).await?;
        let this = self.clone();
        let ctx = ctx.clone();
        let queue = queue.to_owned();

        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = ctx.cancelled() => break,
                    next = sub.recv() => match next {
                        Some(msg) => msg,
                        None => break,
                    },
                };

                let outcome = match &handler {
                    Some(handler) => handler.handle(&ctx, Arc::clone(&msg)).await,
                    None => Ok(()),
                };

                let settled = match outcome {
                    Ok(()) => this.ack(&ctx, &msg).await,
                    Err(e) => {
                        warn!(target: "mqkit::memory", queue = %queue, message_id = msg.id(), error = %e, "handler failed; rejecting message");
                        this.nack(&ctx, &msg, false).await
                    }
                };
                if let Err(e) = settled {
                    warn!(target: "mqkit::memory", queue = %queue, error = %e, "failed to settle message");
                }
            }
            debug!(target: "mqkit::memory", queue = %queue, "callback subscription finished");
        });

        Ok(())
    }

    async fn ack(&self, _ctx: &CancellationToken, msg: &MessageRef) -> Result<()> {
        if let Some(msg) = downcast_memory(msg) {
            if msg.try_ack() {
                self.inner.recorder.ack(DRIVER);
            }
        }
        Ok(())
    }

    async fn nack(&self, _ctx: &CancellationToken, msg: &MessageRef, requeue: bool) -> Result<()> {
        let Some(msg) = downcast_memory(msg) else {
            return Ok(());
        };
        if !msg.try_nack() {
            return Ok(());
        }
        self.inner.recorder.nack(DRIVER);

        if requeue && !self.is_closed() {
            let q = self.inner.registry.get_or_create(msg.queue());
            q.requeue_front(msg);
        }
        Ok(())
    }

    async fn queue_length(&self, _ctx: &CancellationToken, queue: &str) -> Result<i64> {
        let inner = &self.inner;
        inner.recorder.record(DRIVER, "queue_length", queue, || {
            validate_queue(queue)?;
            Ok(inner.registry.get(queue).map_or(0, |q| q.len() as i64))
        })
    }

    async fn purge(&self, _ctx: &CancellationToken, queue: &str) -> Result<()> {
        let inner = &self.inner;
        inner.recorder.record(DRIVER, "purge", queue, || {
            validate_queue(queue)?;
            inner.ensure_open()?;
            if let Some(q) = inner.registry.get(queue) {
                let purged = q.purge();
                debug!(target: "mqkit::memory", queue, purged, "queue purged");
            }
            Ok(())
        })
    }

    async fn close(&self) -> Result<()> {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let queues = self.inner.registry.take_all();
        for q in &queues {
            q.close_consumers();
            q.purge();
        }
        info!(target: "mqkit::memory", queues = queues.len(), "memory manager closed");
        Ok(())
    }
}
