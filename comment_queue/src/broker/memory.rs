use crate::broker::{Broker, ConsumerSession, PartitionFeed, PartitionStream, ProducerSession};
use crate::connection_settings::ConnectionSettings;
use crate::error::ConsumeError;
use crate::message::{ConsumedRecord, Message, PartitionOffset};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, info_span, Instrument};

/// Single-node, in-process broker. Every topic has one partition (0) with an
/// append-only log, so offsets start at 0 and grow by one per write.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SessionEvent {
    ProducerOpened,
    ProducerClosed,
    ConsumerOpened,
    ConsumerClosed,
    PartitionOpened { topic: String, partition: i32 },
    PartitionClosed { topic: String, partition: i32 },
}

#[derive(Default)]
struct Inner {
    logs: Mutex<HashMap<String, Arc<PartitionLog>>>,
    events: Mutex<Vec<SessionEvent>>,
    unreachable: AtomicBool,
    reject_writes: AtomicBool,
    connection_attempts: AtomicU32,
}

enum LogEntry {
    Record(ConsumedRecord),
    Fault(String),
}

struct PartitionLog {
    entries: Mutex<Vec<LogEntry>>,
    next_offset: Mutex<i64>,
    length: watch::Sender<usize>,
}

pub struct MemoryProducerSession {
    broker: MemoryBroker,
}

pub struct MemoryConsumerSession {
    broker: MemoryBroker,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.inner.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.inner.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn connection_attempts(&self) -> u32 {
        self.inner.connection_attempts.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        lock(&self.inner.events).clone()
    }

    pub fn records(&self, topic: &str) -> Vec<ConsumedRecord> {
        let Some(log) = self.find_log(topic) else {
            return vec![];
        };
        let records = lock(&log.entries)
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Record(record) => Some(record.clone()),
                LogEntry::Fault(_) => None,
            })
            .collect();
        records
    }

    pub fn inject_fault(&self, topic: &str, reason: &str) {
        let log = self.log(topic);
        let mut entries = lock(&log.entries);
        entries.push(LogEntry::Fault(reason.to_owned()));
        log.length.send_replace(entries.len());
    }

    fn append(&self, message: &Message) -> PartitionOffset {
        let log = self.log(message.topic());
        let mut entries = lock(&log.entries);
        let mut next_offset = lock(&log.next_offset);

        let partition_offset = PartitionOffset::new(0, *next_offset);
        *next_offset += 1;
        entries.push(LogEntry::Record(ConsumedRecord {
            topic: message.topic().clone(),
            partition_offset,
            timestamp: Some(Utc::now()),
            payload: message.payload().clone(),
        }));
        log.length.send_replace(entries.len());

        partition_offset
    }

    fn log(&self, topic: &str) -> Arc<PartitionLog> {
        lock(&self.inner.logs)
            .entry(topic.to_owned())
            .or_insert_with(|| {
                Arc::new(PartitionLog {
                    entries: Mutex::new(vec![]),
                    next_offset: Mutex::new(0),
                    length: watch::Sender::new(0),
                })
            })
            .clone()
    }

    fn find_log(&self, topic: &str) -> Option<Arc<PartitionLog>> {
        lock(&self.inner.logs).get(topic).cloned()
    }

    fn record_event(&self, event: SessionEvent) {
        lock(&self.inner.events).push(event);
    }

    fn dial(&self) -> Result<(), anyhow::Error> {
        self.inner.connection_attempts.fetch_add(1, Ordering::SeqCst);
        if self.inner.unreachable.load(Ordering::SeqCst) {
            bail!("Connection refused")
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    type Producer = MemoryProducerSession;
    type Consumer = MemoryConsumerSession;

    async fn open_producer(
        &self,
        _settings: &ConnectionSettings,
    ) -> Result<MemoryProducerSession, anyhow::Error> {
        self.dial()?;
        self.record_event(SessionEvent::ProducerOpened);
        Ok(MemoryProducerSession {
            broker: self.clone(),
        })
    }

    async fn open_consumer(
        &self,
        _settings: &ConnectionSettings,
    ) -> Result<MemoryConsumerSession, anyhow::Error> {
        self.dial()?;
        self.record_event(SessionEvent::ConsumerOpened);
        Ok(MemoryConsumerSession {
            broker: self.clone(),
        })
    }
}

#[async_trait]
impl ProducerSession for MemoryProducerSession {
    async fn send(&self, message: &Message) -> Result<PartitionOffset, anyhow::Error> {
        if self.broker.inner.reject_writes.load(Ordering::SeqCst) {
            return Err(anyhow!(
                "Broker refused write to topic {}",
                message.topic()
            ));
        }
        Ok(self.broker.append(message))
    }

    async fn close(self) {
        self.broker.record_event(SessionEvent::ProducerClosed);
    }
}

#[async_trait]
impl ConsumerSession for MemoryConsumerSession {
    async fn open_partition(
        &self,
        topic: &str,
        partition: i32,
    ) -> Result<PartitionStream, anyhow::Error> {
        if partition != 0 {
            bail!("Topic {} has no partition {}", topic, partition)
        }

        let log = self.broker.log(topic);
        let (stream, feed) = PartitionStream::channel(topic, partition);
        self.broker.record_event(SessionEvent::PartitionOpened {
            topic: topic.to_owned(),
            partition,
        });

        let broker = self.broker.clone();
        let topic = topic.to_owned();
        let feeder = tokio::task::spawn(
            async move {
                feed_from_log(&log, &feed).await;
                broker.record_event(SessionEvent::PartitionClosed { topic, partition });
            }
            .instrument(info_span!("Feeding memory partition").or_current()),
        );

        Ok(stream.with_feeder(feeder))
    }

    async fn close(self) {
        self.broker.record_event(SessionEvent::ConsumerClosed);
    }
}

async fn feed_from_log(log: &PartitionLog, feed: &PartitionFeed) {
    let mut length = log.length.subscribe();
    let mut position = 0;

    loop {
        let available = *length.borrow_and_update();
        while position < available {
            let delivered = match next_entry(log, position) {
                Some(LogEntry::Record(record)) => feed.send_record(record).await,
                Some(LogEntry::Fault(reason)) => {
                    feed.send_error(ConsumeError::new(anyhow!(reason))).await
                }
                None => true,
            };
            if !delivered {
                return;
            }
            position += 1;
        }

        select! {
            biased;
            _ = feed.cancellation_token().cancelled() => {
                debug!("Memory partition feeder cancelled");
                return;
            }
            changed = length.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

fn next_entry(log: &PartitionLog, position: usize) -> Option<LogEntry> {
    lock(&log.entries).get(position).map(|entry| match entry {
        LogEntry::Record(record) => LogEntry::Record(record.clone()),
        LogEntry::Fault(reason) => LogEntry::Fault(reason.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConnectionSettings {
        ConnectionSettings::default()
    }

    #[tokio::test]
    async fn offsets_grow_per_topic() {
        let broker = MemoryBroker::new();
        let session = broker.open_producer(&settings()).await.unwrap();

        let first = session
            .send(&Message::new("comments", "a").unwrap())
            .await
            .unwrap();
        let second = session
            .send(&Message::new("comments", "b").unwrap())
            .await
            .unwrap();
        let other = session
            .send(&Message::new("audit", "c").unwrap())
            .await
            .unwrap();

        assert_eq!(*first.offset(), 0);
        assert_eq!(*second.offset(), 1);
        assert_eq!(*other.offset(), 0);
        assert_eq!(broker.records("comments").len(), 2);
    }

    #[tokio::test]
    async fn unreachable_broker_counts_attempts() {
        let broker = MemoryBroker::new();
        broker.set_reachable(false);

        assert!(broker.open_producer(&settings()).await.is_err());
        assert!(broker.open_consumer(&settings()).await.is_err());
        assert_eq!(broker.connection_attempts(), 2);
        assert!(broker.events().is_empty());
    }

    #[tokio::test]
    async fn stream_delivers_existing_and_new_records_and_faults() {
        let broker = MemoryBroker::new();
        let producer = broker.open_producer(&settings()).await.unwrap();
        producer
            .send(&Message::new("comments", "before").unwrap())
            .await
            .unwrap();

        let consumer = broker.open_consumer(&settings()).await.unwrap();
        let mut stream = consumer.open_partition("comments", 0).await.unwrap();

        broker.inject_fault("comments", "leader not available");
        producer
            .send(&Message::new("comments", "after").unwrap())
            .await
            .unwrap();

        let first = stream.records.recv().await.unwrap();
        let fault = stream.errors.recv().await.unwrap();
        let second = stream.records.recv().await.unwrap();

        assert_eq!(first.payload.as_ref(), b"before");
        assert_eq!(first.offset(), 0);
        assert!(fault.to_string().contains("leader not available"));
        assert_eq!(second.payload.as_ref(), b"after");
        assert_eq!(second.offset(), 1);

        stream.close().await;
        consumer.close().await;
        producer.close().await;
    }

    #[tokio::test]
    async fn records_skip_faults_and_unknown_topics() {
        let broker = MemoryBroker::new();
        let session = broker.open_producer(&settings()).await.unwrap();
        assert!(broker.records("comments").is_empty());

        session
            .send(&Message::new("comments", "first").unwrap())
            .await
            .unwrap();
        broker.inject_fault("comments", "offset out of range");
        session
            .send(&Message::new("comments", "second").unwrap())
            .await
            .unwrap();

        let records = broker.records("comments");
        let payloads: Vec<&[u8]> = records.iter().map(|r| r.payload.as_ref()).collect();
        assert_eq!(payloads, vec![b"first".as_ref(), b"second".as_ref()]);
        assert_eq!(records[1].offset(), 1);
    }

    #[tokio::test]
    async fn only_partition_zero_exists() {
        let broker = MemoryBroker::new();
        let consumer = broker.open_consumer(&settings()).await.unwrap();

        assert!(consumer.open_partition("comments", 1).await.is_err());
    }
}
