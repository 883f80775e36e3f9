//! Builds a manager for the configured driver.

use std::sync::Arc;

use tracing::info;

use crate::config::{MqConfig, DRIVER_MEMORY, DRIVER_RABBITMQ};
use crate::core::error::{MqError, Result};
use crate::core::manager::MessageQueueManager;
use crate::core::memory::MemoryManager;
use crate::core::observe::MetricsSink;

/// Builds the manager selected by `config.driver`.
pub fn build(config: &MqConfig) -> Result<Arc<dyn MessageQueueManager>> {
    build_with_sink(config, None)
}

/// Like [`build`], reporting operation metrics to `sink`.
pub fn build_with_sink(
    config: &MqConfig,
    sink: Option<Arc<dyn MetricsSink>>,
) -> Result<Arc<dyn MessageQueueManager>> {
    let mut config = config.clone();
    config.validate()?;

    match config.driver.as_str() {
        DRIVER_MEMORY => {
            info!(
                max_queue_size = config.memory.max_queue_size,
                channel_buffer = config.memory.channel_buffer,
                "building memory message queue manager"
            );
            Ok(Arc::new(MemoryManager::from_config(&config.memory, sink)))
        }
        // The broker adapter talks to an external server and lives outside this crate.
        DRIVER_RABBITMQ => Err(MqError::DriverUnavailable(config.driver.clone())),
        other => Err(MqError::UnsupportedDriver(other.to_owned())),
    }
}
