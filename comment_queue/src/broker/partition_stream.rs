use crate::error::ConsumeError;
use crate::message::ConsumedRecord;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub const PARTITION_CHANNEL_CAPACITY: usize = 128;

pub struct PartitionStream {
    topic: String,
    partition: i32,
    pub(crate) records: Receiver<ConsumedRecord>,
    pub(crate) errors: Receiver<ConsumeError>,
    cancellation_token: CancellationToken,
    feeder: Option<JoinHandle<()>>,
}

pub struct PartitionFeed {
    records: Sender<ConsumedRecord>,
    errors: Sender<ConsumeError>,
    cancellation_token: CancellationToken,
}

impl PartitionStream {
    pub fn channel(topic: &str, partition: i32) -> (Self, PartitionFeed) {
        let (records_tx, records_rx) = tokio::sync::mpsc::channel(PARTITION_CHANNEL_CAPACITY);
        let (errors_tx, errors_rx) = tokio::sync::mpsc::channel(PARTITION_CHANNEL_CAPACITY);
        let cancellation_token = CancellationToken::new();

        let stream = Self {
            topic: topic.to_owned(),
            partition,
            records: records_rx,
            errors: errors_rx,
            cancellation_token: cancellation_token.clone(),
            feeder: None,
        };
        let feed = PartitionFeed {
            records: records_tx,
            errors: errors_tx,
            cancellation_token,
        };

        (stream, feed)
    }

    pub fn with_feeder(mut self, feeder: JoinHandle<()>) -> Self {
        self.feeder = Some(feeder);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    pub async fn close(mut self) {
        self.cancellation_token.cancel();
        if let Some(feeder) = self.feeder.take() {
            if let Err(e) = feeder.await {
                error!(
                    "Partition feeder for topic {} partition {} failed: {:?}",
                    self.topic, self.partition, e
                );
            }
        }
        debug!(
            "Closed partition stream. Topic: '{}', partition: {}",
            self.topic, self.partition
        );
    }
}

impl PartitionFeed {
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Returns `false` once the stream is closed or dropped.
    pub async fn send_record(&self, record: ConsumedRecord) -> bool {
        select! {
            result = self.records.send(record) => result.is_ok(),
            _ = self.cancellation_token.cancelled() => false,
        }
    }

    /// Returns `false` once the stream is closed or dropped.
    pub async fn send_error(&self, error: ConsumeError) -> bool {
        select! {
            result = self.errors.send(error) => result.is_ok(),
            _ = self.cancellation_token.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::PartitionOffset;
    use bytes::Bytes;

    fn record(offset: i64) -> ConsumedRecord {
        ConsumedRecord {
            topic: "comments".to_owned(),
            partition_offset: PartitionOffset::new(0, offset),
            timestamp: None,
            payload: Bytes::from_static(b"{}"),
        }
    }

    #[tokio::test]
    async fn close_stops_feeder_blocked_on_full_channel() {
        let (stream, feed) = PartitionStream::channel("comments", 0);
        let feeder = tokio::spawn(async move {
            let mut offset = 0;
            while feed.send_record(record(offset)).await {
                offset += 1;
            }
        });
        let stream = stream.with_feeder(feeder);

        tokio::time::timeout(std::time::Duration::from_secs(5), stream.close())
            .await
            .expect("close should not hang on a full channel");
    }

    #[tokio::test]
    async fn feed_reports_dropped_stream() {
        let (stream, feed) = PartitionStream::channel("comments", 0);
        drop(stream);

        assert!(!feed.send_record(record(0)).await);
        assert!(!feed.send_error(ConsumeError::new(anyhow::anyhow!("gone"))).await);
    }
}
