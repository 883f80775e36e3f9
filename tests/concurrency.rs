#[path = "common.rs"]
mod common;

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use mqkit::{MemoryManager, Message, MessageQueueManager, MqError, PublishOptions, SubscribeOptions};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_publishers_lose_nothing() {
    common::init_logging();
    const PUBLISHERS: usize = 100;
    const PER_PUBLISHER: usize = 100;

    // The buffer holds the whole backlog so one subscribe drains it all.
    let mgr = MemoryManager::new(0, PUBLISHERS * PER_PUBLISHER);
    let ctx = CancellationToken::new();

    let mut handles = Vec::with_capacity(PUBLISHERS);
    for p in 0..PUBLISHERS {
        let mgr = mgr.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..PER_PUBLISHER {
                mgr.publish(&ctx, "shared", Bytes::from(format!("{p}-{i}")), PublishOptions::new())
                    .await
                    .unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let total = (PUBLISHERS * PER_PUBLISHER) as i64;
    assert_eq!(mgr.queue_length(&ctx, "shared").await.unwrap(), total);

    // Draining confirms every entry is distinct.
    let sub = mgr.subscribe(&ctx, "shared", SubscribeOptions::new()).await.unwrap();
    let mut seen = HashSet::new();
    while seen.len() < total as usize {
        let msg = common::recv(&sub).await.expect("backlog message");
        seen.insert(msg.id().to_string());
    }
    assert_eq!(seen.len(), total as usize);
    assert_eq!(mgr.queue_length(&ctx, "shared").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_subscribe_shares_one_queue() {
    let mgr = MemoryManager::new(0, 0);
    let ctx = CancellationToken::new();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let mgr = mgr.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            mgr.subscribe(&ctx, "race", SubscribeOptions::new()).await.unwrap()
        }));
    }
    let mut subs = Vec::new();
    for h in handles {
        subs.push(h.await.unwrap());
    }

    assert_eq!(mgr.queue_count(), 1);
    assert_eq!(mgr.consumer_count("race"), 10);

    mgr.publish(&ctx, "race", Bytes::from_static(b"all"), PublishOptions::new())
        .await
        .unwrap();
    for sub in &subs {
        let msg = common::recv(sub).await.expect("broadcast");
        assert_eq!(common::body_str(&msg), "all");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn queues_progress_independently() {
    let mgr = Arc::new(MemoryManager::new(0, 0));
    let ctx = CancellationToken::new();

    let mut handles = Vec::new();
    for q in 0..8 {
        let mgr = mgr.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            let name = format!("q{q}");
            for _ in 0..250 {
                mgr.publish(&ctx, &name, Bytes::from_static(b"m"), PublishOptions::new())
                    .await
                    .unwrap();
            }
            mgr.queue_length(&ctx, &name).await.unwrap()
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap(), 250);
    }
    assert_eq!(mgr.queue_count(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn publishes_racing_close_leave_no_queues_behind() {
    let mgr = MemoryManager::new(0, 0);
    let ctx = CancellationToken::new();

    let mut handles = Vec::new();
    for p in 0..8 {
        let mgr = mgr.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            let mut i = 0u64;
            loop {
                let queue = format!("p{p}-{}", i % 16);
                match mgr.publish(&ctx, &queue, Bytes::from_static(b"m"), PublishOptions::new()).await {
                    Ok(()) => i += 1,
                    Err(MqError::ManagerClosed) => break,
                    Err(other) => panic!("unexpected publish error: {other:?}"),
                }
                if i % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    mgr.close().await.unwrap();
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(mgr.queue_count(), 0);
    for p in 0..8 {
        for q in 0..16 {
            let name = format!("p{p}-{q}");
            assert_eq!(mgr.queue_length(&ctx, &name).await.unwrap(), 0);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn late_subscribers_never_see_duplicates() {
    const MESSAGES: usize = 2_000;
    let mgr = MemoryManager::new(0, MESSAGES);
    let ctx = CancellationToken::new();

    let publisher = {
        let mgr = mgr.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            for i in 0..MESSAGES {
                mgr.publish(&ctx, "late", Bytes::from(format!("m-{i}")), PublishOptions::new())
                    .await
                    .unwrap();
                if i % 50 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    let mut subs = Vec::new();
    for _ in 0..8 {
        subs.push(
            mgr.subscribe(&ctx, "late", SubscribeOptions::new().auto_ack(false))
                .await
                .unwrap(),
        );
        tokio::task::yield_now().await;
    }
    publisher.await.unwrap();

    for sub in &subs {
        let mut seen = HashSet::new();
        while let Ok(Some(msg)) =
            tokio::time::timeout(std::time::Duration::from_millis(200), sub.recv()).await
        {
            assert!(seen.insert(msg.id().to_string()), "duplicate delivery of {}", msg.id());
        }
    }
}
