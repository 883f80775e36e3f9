use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::memory::queue::{ConsumerId, Delivery, MemoryQueue};
use crate::core::memory::DRIVER;
use crate::core::message::MessageRef;
use crate::core::observe::Recorder;

/// Background pump bridging a queue's delivery channel to a subscriber.
///
/// The pump ends when its context is cancelled, when the manager closes the
/// delivery channel, or when the subscriber drops its stream. In every case it
/// deregisters from the queue and drops the output sender, which closes the
/// subscriber's stream.
pub(crate) struct ConsumerSession {
    pub(crate) id: ConsumerId,
    pub(crate) queue: Arc<MemoryQueue>,
    pub(crate) inbox: flume::Receiver<Delivery>,
    pub(crate) outbox: flume::Sender<MessageRef>,
    pub(crate) ctx: CancellationToken,
    pub(crate) auto_ack: bool,
    pub(crate) recorder: Recorder,
}

impl ConsumerSession {
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        debug!(target: "mqkit::session", queue = self.queue.name(), consumer = self.id, "consumer session started");

        loop {
            let msg = tokio::select! {
                biased;
                _ = self.ctx.cancelled() => break,
                next = self.inbox.recv_async() => match next {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };

            self.recorder.consume(DRIVER);
            // Every auto-ack session counts its own ack, even when a fanned-out
            // copy was already marked by another session.
            if self.auto_ack {
                msg.try_ack();
                self.recorder.ack(DRIVER);
            }
            // Live broadcasts leave a copy in the backlog.
            self.queue.remove(&msg);

            if self.outbox.is_disconnected() {
                break;
            }
            let out: MessageRef = msg;
            let sent = tokio::select! {
                biased;
                _ = self.ctx.cancelled() => break,
                sent = self.outbox.send_async(out) => sent,
            };
            if sent.is_err() {
                break;
            }
        }

        self.queue.deregister(self.id);
        debug!(target: "mqkit::session", queue = self.queue.name(), consumer = self.id, "consumer session stopped");
    }
}
