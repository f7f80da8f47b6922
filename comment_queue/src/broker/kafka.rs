use crate::broker::{Broker, ConsumerSession, PartitionFeed, PartitionStream, ProducerSession};
use crate::connection_settings::ConnectionSettings;
use crate::consumer::ConsumerWrapper;
use crate::error::ConsumeError;
use crate::message::{ConsumedRecord, Message, PartitionOffset};
use crate::producer::ProducerWrapper;
use anyhow::{bail, Context};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rdkafka::client::{Client, ClientContext};
use rdkafka::consumer::Consumer;
use rdkafka::message::BorrowedMessage;
use rdkafka::producer::{FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tracing::{debug, error, info_span, trace, warn, Instrument};

#[derive(Debug, Default, Clone, Copy)]
pub struct KafkaBroker;

pub struct KafkaProducerSession {
    producer: ProducerWrapper,
    flush_timeout: Duration,
}

pub struct KafkaConsumerSession {
    consumer: Arc<ConsumerWrapper>,
}

#[async_trait]
impl Broker for KafkaBroker {
    type Producer = KafkaProducerSession;
    type Consumer = KafkaConsumerSession;

    async fn open_producer(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<KafkaProducerSession, anyhow::Error> {
        let producer = ProducerWrapper::create(settings).context("While creating producer")?;
        let dial_timeout = settings.dial_timeout();

        let probe = producer.clone();
        tokio::task::spawn_blocking(move || probe_brokers(probe.client(), dial_timeout))
            .await
            .context("While joining blocking handle")??;

        Ok(KafkaProducerSession {
            producer,
            flush_timeout: dial_timeout,
        })
    }

    async fn open_consumer(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<KafkaConsumerSession, anyhow::Error> {
        let consumer =
            Arc::new(ConsumerWrapper::create(settings).context("While creating consumer")?);
        let dial_timeout = settings.dial_timeout();

        let probe = consumer.clone();
        tokio::task::spawn_blocking(move || probe_brokers(probe.client(), dial_timeout))
            .await
            .context("While joining blocking handle")??;

        Ok(KafkaConsumerSession { consumer })
    }
}

#[async_trait]
impl ProducerSession for KafkaProducerSession {
    async fn send(&self, message: &Message) -> Result<PartitionOffset, anyhow::Error> {
        let record = FutureRecord::<(), [u8]>::to(message.topic()).payload(message.payload().as_ref());

        let (partition, offset) = self
            .producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(e, _)| e)
            .context("While producing message")?;

        Ok(PartitionOffset::new(partition, offset))
    }

    async fn close(self) {
        let producer = self.producer;
        let flush_timeout = self.flush_timeout;
        let flushed =
            tokio::task::spawn_blocking(move || producer.flush(Timeout::After(flush_timeout)))
                .await;

        match flushed {
            Ok(Ok(())) => debug!("Producer session closed"),
            Ok(Err(e)) => warn!("Error while flushing producer on close: {:?}", e),
            Err(e) => error!("Error while joining producer flush: {:?}", e),
        }
    }
}

#[async_trait]
impl ConsumerSession for KafkaConsumerSession {
    async fn open_partition(
        &self,
        topic: &str,
        partition: i32,
    ) -> Result<PartitionStream, anyhow::Error> {
        self.consumer
            .assign_from_beginning(topic, partition)
            .context("While assigning partition to consumer")?;

        let (stream, feed) = PartitionStream::channel(topic, partition);
        let feeder = tokio::task::spawn(
            feed_partition(self.consumer.clone(), feed)
                .instrument(info_span!("Feeding partition", topic, partition).or_current()),
        );

        Ok(stream.with_feeder(feeder))
    }

    async fn close(self) {
        if let Err(e) = self.consumer.unassign() {
            warn!("Error while unassigning consumer on close: {:?}", e);
        }
        debug!("Consumer session closed");
    }
}

async fn feed_partition(consumer: Arc<ConsumerWrapper>, feed: PartitionFeed) {
    loop {
        let message_result = select! {
            biased;
            _ = feed.cancellation_token().cancelled() => {
                break
            }
            msg = consumer.recv() => {
                msg.map(|message| to_record(&message))
            }
        };

        let delivered = match message_result {
            Ok(record) => {
                trace!(
                    "New message. Topic: '{}', partition: {}, offset: {}",
                    record.topic,
                    record.partition(),
                    record.offset(),
                );
                feed.send_record(record).await
            }
            Err(e) => feed.send_error(ConsumeError::new(e)).await,
        };

        if !delivered {
            break;
        }
    }
    debug!("Partition feeder stopped");
}

fn to_record(message: &BorrowedMessage<'_>) -> ConsumedRecord {
    use rdkafka::Message as _;

    ConsumedRecord {
        topic: message.topic().to_owned(),
        partition_offset: PartitionOffset::new(message.partition(), message.offset()),
        timestamp: message
            .timestamp()
            .to_millis()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        payload: message
            .payload()
            .map(Bytes::copy_from_slice)
            .unwrap_or_default(),
    }
}

fn probe_brokers<C: ClientContext>(
    client: &Client<C>,
    timeout: Duration,
) -> Result<(), anyhow::Error> {
    let metadata = client
        .fetch_metadata(None, Timeout::After(timeout))
        .context("While fetching cluster metadata")?;

    if metadata.brokers().is_empty() {
        bail!("Cluster metadata lists no brokers")
    }

    debug!(
        "Broker reachable, {} broker(s) in cluster",
        metadata.brokers().len()
    );
    Ok(())
}
