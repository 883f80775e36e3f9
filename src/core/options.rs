use crate::core::message::Headers;

/// Per-publish options.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub headers: Option<Headers>,
    /// Ask the backend to persist the message. Ignored by the memory broker.
    pub durable: bool,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }
}

/// Per-subscription options. `auto_ack` defaults to `true`.
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Ask the backend for a durable subscription. Ignored by the memory broker.
    pub durable: bool,
    pub auto_ack: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            durable: false,
            auto_ack: true,
        }
    }
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn auto_ack(mut self, auto_ack: bool) -> Self {
        self.auto_ack = auto_ack;
        self
    }
}
