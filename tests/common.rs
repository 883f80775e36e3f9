#![allow(dead_code)]

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use mqkit::{Message, MessageRef, Subscription};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = mqkit::logging::init_logging_with("warn");
    });
}

/// Waits up to two seconds for the next message.
pub async fn recv(sub: &Subscription) -> Option<MessageRef> {
    tokio::time::timeout(Duration::from_secs(2), sub.recv())
        .await
        .ok()
        .flatten()
}

pub fn body_str(msg: &MessageRef) -> String {
    String::from_utf8_lossy(msg.body()).into_owned()
}

/// Polls `check` every 5ms until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
