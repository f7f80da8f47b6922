mod kafka;
mod memory;
mod partition_stream;

pub use kafka::*;
pub use memory::*;
pub use partition_stream::*;

use crate::connection_settings::ConnectionSettings;
use crate::message::{Message, PartitionOffset};
use async_trait::async_trait;

/// A transport able to open sessions against a broker cluster.
///
/// Each call is a single attempt; retrying is left to
/// [`ClientFactory`](crate::connection::ClientFactory).
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    type Producer: ProducerSession;
    type Consumer: ConsumerSession;

    async fn open_producer(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Self::Producer, anyhow::Error>;

    async fn open_consumer(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Self::Consumer, anyhow::Error>;
}

#[async_trait]
pub trait ProducerSession: Send + Sync {
    /// Resolves once the broker has acknowledged the write at the configured
    /// acknowledgement level.
    async fn send(&self, message: &Message) -> Result<PartitionOffset, anyhow::Error>;

    async fn close(self);
}

#[async_trait]
pub trait ConsumerSession: Send + Sync {
    async fn open_partition(
        &self,
        topic: &str,
        partition: i32,
    ) -> Result<PartitionStream, anyhow::Error>;

    /// Must only be called after every stream opened from this session was
    /// closed.
    async fn close(self);
}
