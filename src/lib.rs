//! mqkit – a message-queue abstraction with interchangeable backends.
//!
//! This crate exports
//!  * `core`    – the manager contract, messages, options and the in-process broker
//!  * `config`  – TOML + environment driven configuration
//!  * `metrics` – an atomic-counter metrics sink
//!  * `logging` – tracing subscriber setup
//!
//! Applications pick a backend through [`build`] or embed
//! [`MemoryManager`] directly.

// ───────────────────────────────────────────────────────────
// Public modules
// ───────────────────────────────────────────────────────────
pub mod config;
pub mod core;
pub mod logging;
pub mod metrics;

// ───────────────────────────────────────────────────────────
// Re-exports
// ───────────────────────────────────────────────────────────
pub use config::{ConfigError, MemoryConfig, MqConfig};
pub use core::error::{MqError, Result};
pub use core::factory::{build, build_with_sink};
pub use core::manager::{MessageHandler, MessageQueueManager, Subscription};
pub use core::memory::MemoryManager;
pub use core::message::{Headers, MemoryMessage, Message, MessageRef};
pub use core::observe::{MetricsSink, Recorder, Status};
pub use core::options::{PublishOptions, SubscribeOptions};
pub use metrics::Counters;
