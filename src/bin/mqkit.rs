//! mqkit – drive the in-process broker from the command line.
//
//  $ mqkit bench --config mqkit.toml --messages 100000 --subscribers 4
//  $ mqkit check-config --config mqkit.toml
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use mqkit::logging::init_logging;
use mqkit::{
    Counters, MemoryManager, MessageQueueManager, MetricsSink, MqConfig, PublishOptions,
    SubscribeOptions,
};

#[derive(Debug, Parser)]
#[command(name = "mqkit", version, about = "mqkit in-process broker driver")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish a batch of messages and consume them with N subscribers.
    Bench {
        /// Path to config TOML (env MQKIT_CONFIG is used when omitted)
        #[arg(short, long)]
        config: Option<String>,
        #[arg(short, long, default_value = "bench")]
        queue: String,
        #[arg(short, long, default_value_t = 10_000)]
        messages: u64,
        #[arg(short, long, default_value_t = 1)]
        subscribers: usize,
        /// Acknowledge explicitly instead of auto-ack
        #[arg(long)]
        manual_ack: bool,
        /// Seconds to wait for consumers after the last publish
        #[arg(long, default_value_t = 5)]
        drain_timeout: u64,
    },
    /// Load and validate a configuration, then print it.
    CheckConfig {
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.cmd {
        Command::Bench {
            config,
            queue,
            messages,
            subscribers,
            manual_ack,
            drain_timeout,
        } => {
            let cfg = MqConfig::load(config.as_deref())?;
            bench(&cfg, &queue, messages, subscribers, manual_ack, Duration::from_secs(drain_timeout)).await?;
        }
        Command::CheckConfig { config } => {
            let cfg = MqConfig::load(config.as_deref())?;
            println!("{cfg:#?}");
        }
    }
    Ok(())
}

async fn bench(
    cfg: &MqConfig,
    queue: &str,
    messages: u64,
    subscribers: usize,
    manual_ack: bool,
    drain_timeout: Duration,
) -> anyhow::Result<()> {
    let counters = Arc::new(Counters::new());
    let manager = MemoryManager::from_config(&cfg.memory, Some(counters.clone() as Arc<dyn MetricsSink>));
    let ctx = CancellationToken::new();
    let received = Arc::new(AtomicU64::new(0));

    let mut workers = Vec::with_capacity(subscribers);
    for _ in 0..subscribers {
        let sub = manager
            .subscribe(&ctx, queue, SubscribeOptions::new().auto_ack(!manual_ack))
            .await?;
        let manager = manager.clone();
        let ctx = ctx.clone();
        let received = received.clone();
        workers.push(tokio::spawn(async move {
            while let Some(msg) = sub.recv().await {
                received.fetch_add(1, Ordering::Relaxed);
                if manual_ack {
                    let _ = manager.ack(&ctx, &msg).await;
                }
            }
        }));
    }

    let start = Instant::now();
    let mut rejected = 0u64;
    for i in 0..messages {
        let body = Bytes::from(format!("msg-{i}"));
        if manager.publish(&ctx, queue, body, PublishOptions::new()).await.is_err() {
            rejected += 1;
        }
    }
    let publish_elapsed = start.elapsed();

    let deadline = Instant::now() + drain_timeout;
    while received.load(Ordering::Relaxed) < messages - rejected && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let backlog = manager.queue_length(&ctx, queue).await?;
    ctx.cancel();
    manager.close().await?;
    for worker in workers {
        let _ = worker.await;
    }

    info!(
        queue,
        messages,
        rejected,
        received = received.load(Ordering::Relaxed),
        backlog,
        ?publish_elapsed,
        "bench finished"
    );
    println!(
        "published {} messages in {:?} ({:.0} msg/s), {} rejected",
        messages - rejected,
        publish_elapsed,
        messages as f64 / publish_elapsed.as_secs_f64().max(f64::EPSILON),
        rejected
    );
    print!("{}", counters.snapshot());
    Ok(())
}
