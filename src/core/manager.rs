//! Backend-neutral manager contract.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::core::error::Result;
use crate::core::message::MessageRef;
use crate::core::options::{PublishOptions, SubscribeOptions};

/// Callback invoked by [`MessageQueueManager::subscribe_with_callback`].
///
/// `Ok` acknowledges the message, `Err` rejects it without requeue.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, ctx: &CancellationToken, msg: MessageRef) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(CancellationToken, MessageRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: &CancellationToken, msg: MessageRef) -> anyhow::Result<()> {
        (self)(ctx.clone(), msg).await
    }
}

/// Read side of a subscription.
///
/// Yields `None` once the subscription's context is cancelled or the manager
/// is closed.
#[derive(Debug)]
pub struct Subscription {
    rx: flume::Receiver<MessageRef>,
}

impl Subscription {
    pub(crate) fn new(rx: flume::Receiver<MessageRef>) -> Self {
        Self { rx }
    }

    /// Waits for the next message.
    pub async fn recv(&self) -> Option<MessageRef> {
        self.rx.recv_async().await.ok()
    }

    /// Returns a buffered message without waiting.
    pub fn try_recv(&self) -> Option<MessageRef> {
        self.rx.try_recv().ok()
    }

    /// True once the producing side has gone away.
    pub fn is_closed(&self) -> bool {
        self.rx.is_disconnected()
    }

    pub fn into_stream(self) -> impl Stream<Item = MessageRef> + Send + 'static {
        self.rx.into_stream()
    }
}

/// Message queue manager with an interchangeable backend.
#[async_trait]
pub trait MessageQueueManager: Send + Sync {
    fn manager_name(&self) -> &str;

    fn health(&self) -> Result<()>;

    async fn on_start(&self) -> Result<()>;

    async fn on_stop(&self) -> Result<()>;

    /// Publishes `body` to `queue`, creating the queue on first use.
    async fn publish(
        &self,
        ctx: &CancellationToken,
        queue: &str,
        body: Bytes,
        opts: PublishOptions,
    ) -> Result<()>;

    /// Opens a subscription that lives until `ctx` is cancelled or the
    /// manager is closed.
    async fn subscribe(
        &self,
        ctx: &CancellationToken,
        queue: &str,
        opts: SubscribeOptions,
    ) -> Result<Subscription>;

    /// Subscribes and drives `handler` on a background task. Handler errors
    /// never reach the caller.
    async fn subscribe_with_callback(
        &self,
        ctx: &CancellationToken,
        queue: &str,
        handler: Option<Arc<dyn MessageHandler>>,
        opts: SubscribeOptions,
    ) -> Result<()>;

    async fn ack(&self, ctx: &CancellationToken, msg: &MessageRef) -> Result<()>;

    async fn nack(&self, ctx: &CancellationToken, msg: &MessageRef, requeue: bool) -> Result<()>;

    /// Number of messages waiting in the backlog. In-flight messages are not
    /// counted.
    async fn queue_length(&self, ctx: &CancellationToken, queue: &str) -> Result<i64>;

    async fn purge(&self, ctx: &CancellationToken, queue: &str) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
