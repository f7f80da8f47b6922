use crate::connection_settings::ConnectionSettings;
use anyhow::Context;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Offset, TopicPartitionList};
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

pub struct ConsumerWrapper {
    consumer: StreamConsumer,
}

impl ConsumerWrapper {
    pub fn create(connection_settings: &ConnectionSettings) -> Result<Self, anyhow::Error> {
        // Partitions are assigned manually, the group only satisfies librdkafka
        let group = format!("comment-queue-worker-{}", Uuid::now_v7());

        // https://raw.githubusercontent.com/confluentinc/librdkafka/master/CONFIGURATION.md
        let mut config = ClientConfig::try_from(connection_settings)?;
        let consumer: StreamConsumer = config
            .set("group.id", group)
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "10000")
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .create()
            .context("While creating kafka StreamConsumer")?;

        Ok(Self { consumer })
    }

    pub fn assign_from_beginning(&self, topic: &str, partition: i32) -> Result<(), anyhow::Error> {
        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(topic, partition, Offset::Beginning)
            .context("While building partition assignment")?;

        self.consumer
            .assign(&assignment)
            .context("While assigning partition")?;

        Ok(())
    }
}

impl DerefMut for ConsumerWrapper {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.consumer
    }
}

impl Deref for ConsumerWrapper {
    type Target = StreamConsumer;

    fn deref(&self) -> &Self::Target {
        &self.consumer
    }
}
