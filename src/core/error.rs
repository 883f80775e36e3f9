use thiserror::Error;

use crate::config::ConfigError;

/// Errors returned by message queue managers.
#[derive(Debug, Error)]
pub enum MqError {
    #[error("queue name cannot be empty")]
    EmptyQueueName,

    #[error("queue is full: {0}")]
    QueueFull(String),

    #[error("manager is shutting down")]
    ManagerClosed,

    #[error("unsupported driver type: {0} (must be rabbitmq or memory)")]
    UnsupportedDriver(String),

    /// The driver is recognised but its adapter is not built into this crate.
    #[error("driver not available in this build: {0}")]
    DriverUnavailable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, MqError>;

/// Rejects empty queue names before any state is touched.
pub fn validate_queue(queue: &str) -> Result<()> {
    if queue.is_empty() {
        return Err(MqError::EmptyQueueName);
    }
    Ok(())
}
