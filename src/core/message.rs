use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

/// Message headers. Values are dynamically typed.
pub type Headers = HashMap<String, serde_json::Value>;

/// Shared handle to a delivered message.
pub type MessageRef = Arc<dyn Message>;

/// Backend-neutral view of a delivered message.
///
/// Managers downcast through [`Message::as_any`] / [`Message::into_any`] to
/// recover their own message type on `ack` / `nack`; messages from another
/// backend are simply ignored there.
pub trait Message: Send + Sync + Debug {
    fn id(&self) -> &str;

    fn body(&self) -> &Bytes;

    fn headers(&self) -> Option<&Headers>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Message owned by the in-process broker.
///
/// The envelope is immutable once built. Delivery state is two independent
/// flags, each flipped with a compare-and-swap, so an ack may follow a nack
/// and vice versa.
#[derive(Debug)]
pub struct MemoryMessage {
    id: String,
    queue: String,
    body: Bytes,
    headers: Option<Headers>,
    acked: AtomicBool,
    nacked: AtomicBool,
}

impl MemoryMessage {
    /// Builds a message with a fresh UUID v4 id.
    pub fn new(queue: impl Into<String>, body: impl Into<Bytes>, headers: Option<Headers>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            queue: queue.into(),
            body: body.into(),
            headers,
            acked: AtomicBool::new(false),
            nacked: AtomicBool::new(false),
        }
    }

    /// Name of the queue the message was published to.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::Acquire)
    }

    pub fn is_nacked(&self) -> bool {
        self.nacked.load(Ordering::Acquire)
    }

    /// Flips `acked` to true and clears `nacked`.
    ///
    /// Returns `false` when the message was already acked.
    pub(crate) fn try_ack(&self) -> bool {
        if self
            .acked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.nacked.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Flips `nacked` to true and clears `acked`.
    ///
    /// Returns `false` when the message was already nacked.
    pub(crate) fn try_nack(&self) -> bool {
        if self
            .nacked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.acked.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }
}

impl Message for MemoryMessage {
    fn id(&self) -> &str {
        &self.id
    }

    fn body(&self) -> &Bytes {
        &self.body
    }

    fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Recovers the broker's own message from a shared handle.
///
/// Returns `None` for messages produced by another implementation.
pub(crate) fn downcast_memory(msg: &MessageRef) -> Option<Arc<MemoryMessage>> {
    if !msg.as_any().is::<MemoryMessage>() {
        return None;
    }
    Arc::clone(msg).into_any().downcast::<MemoryMessage>().ok()
}
