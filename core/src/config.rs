use std::time::Duration;

use rowsync_proto::OrderBy;

/// Settings shared by every cache a [`crate::Client`] creates
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Ordering requested from snapshot reads. Rows arriving later are prepended regardless.
    pub order_by: OrderBy,

    /// Upper bound on a single snapshot read. `None` leaves timing to the transport.
    pub snapshot_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self { Self { order_by: OrderBy::default(), snapshot_timeout: None } }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder { ClientConfigBuilder { config: ClientConfig::default() } }
}

/// Builder for [`ClientConfig`] starting from the defaults
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.config.order_by = order_by;
        self
    }

    pub fn snapshot_timeout(mut self, timeout: Duration) -> Self {
        self.config.snapshot_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> ClientConfig { self.config }
}
