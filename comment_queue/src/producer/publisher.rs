use crate::broker::{Broker, ProducerSession};
use crate::connection::ClientFactory;
use crate::error::PublishError;
use crate::message::{Message, PartitionOffset};
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

pub struct Publisher<B> {
    factory: Arc<ClientFactory<B>>,
}

impl<B: Broker> Publisher<B> {
    pub fn new(factory: Arc<ClientFactory<B>>) -> Self {
        Self { factory }
    }

    #[tracing::instrument(skip_all, fields(topic = %topic))]
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Bytes>,
    ) -> Result<PartitionOffset, PublishError> {
        let message = Message::new(topic, payload)?;

        let session = self.factory.connect_producer().await?;
        let send_result = session.send(&message).await;
        session.close().await;

        let partition_offset = send_result.map_err(|source| PublishError::Send {
            topic: topic.to_owned(),
            source,
        })?;

        info!(
            "Message stored in topic({})/partition({})/offset({})",
            topic,
            partition_offset.partition(),
            partition_offset.offset()
        );

        Ok(partition_offset)
    }
}
