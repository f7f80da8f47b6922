use crate::broker::{Broker, ConsumerSession, PartitionStream};
use crate::connection::ClientFactory;
use crate::consumer::{LogRecordSink, RecordSink};
use crate::error::{ConnectionError, ConsumerLoopError};
use std::sync::Arc;
use tokio::select;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LoopState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConsumeSummary {
    pub consumed: u64,
}

pub struct ConsumerLoop<S = LogRecordSink> {
    topic: String,
    partition: i32,
    sink: S,
    state: Arc<watch::Sender<LoopState>>,
}

impl ConsumerLoop<LogRecordSink> {
    pub fn new(topic: &str, partition: i32) -> Self {
        Self::with_sink(topic, partition, LogRecordSink)
    }
}

impl<S: RecordSink> ConsumerLoop<S> {
    pub fn with_sink(topic: &str, partition: i32, sink: S) -> Self {
        Self {
            topic: topic.to_owned(),
            partition,
            sink,
            state: Arc::new(watch::Sender::new(LoopState::Starting)),
        }
    }

    pub fn state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    #[tracing::instrument(skip_all, fields(topic = %self.topic, partition = self.partition))]
    pub async fn run<B: Broker>(
        self,
        factory: &ClientFactory<B>,
        shutdown: CancellationToken,
    ) -> Result<ConsumeSummary, ConsumerLoopError> {
        let Self {
            topic,
            partition,
            sink,
            state,
        } = self;

        let connected = select! {
            biased;
            _ = shutdown.cancelled() => None,
            connected = factory.connect_consumer() => Some(connected),
        };
        let session = match connected {
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                state.send_replace(LoopState::Stopped);
                return Err(e.into());
            }
            None => {
                info!("Shutdown requested before the consumer connected");
                state.send_replace(LoopState::Stopped);
                return Ok(ConsumeSummary { consumed: 0 });
            }
        };

        let opened = select! {
            biased;
            _ = shutdown.cancelled() => None,
            opened = session.open_partition(&topic, partition) => Some(opened),
        };
        let stream = match opened {
            Some(Ok(stream)) => stream,
            None => {
                info!("Shutdown requested before the partition was opened");
                session.close().await;
                state.send_replace(LoopState::Stopped);
                return Ok(ConsumeSummary { consumed: 0 });
            }
            Some(Err(source)) => {
                session.close().await;
                state.send_replace(LoopState::Stopped);
                return Err(ConnectionError::Partition {
                    topic,
                    partition,
                    source,
                }
                .into());
            }
        };

        info!("Consumer started successfully");
        state.send_replace(LoopState::Running);

        let (done_tx, done_rx) = oneshot::channel();
        let loop_state = state.clone();
        let consuming = async move {
            let outcome = consume_partition(stream, sink, shutdown, &loop_state).await;
            let _ = done_tx.send(outcome);
        }
        .instrument(info_span!("Consuming partition").or_current());
        tokio::task::spawn(consuming);

        let outcome = done_rx.await;

        let result = match outcome {
            Ok((stream, consumed)) => {
                info!("Gracefully shutting down...");
                stream.close().await;
                Ok(ConsumeSummary { consumed })
            }
            Err(_) => {
                error!("Consumer task ended without returning its partition stream");
                Err(ConsumerLoopError::Aborted)
            }
        };

        session.close().await;
        state.send_replace(LoopState::Stopped);

        if let Ok(summary) = &result {
            info!("Consumer stopped after {} message(s)", summary.consumed);
        }
        result
    }
}

async fn consume_partition<S: RecordSink>(
    mut stream: PartitionStream,
    mut sink: S,
    shutdown: CancellationToken,
    state: &watch::Sender<LoopState>,
) -> (PartitionStream, u64) {
    let mut consumed: u64 = 0;
    let mut records_open = true;
    let mut errors_open = true;

    loop {
        select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received");
                state.send_replace(LoopState::Stopping);
                break;
            }
            record = stream.records.recv(), if records_open => {
                match record {
                    Some(record) => {
                        consumed += 1;
                        sink.handle(consumed, &record);
                    }
                    None => {
                        warn!("Record source closed, waiting for shutdown");
                        records_open = false;
                    }
                }
            }
            error = stream.errors.recv(), if errors_open => {
                match error {
                    Some(e) => error!("Error: {:?}", e),
                    None => errors_open = false,
                }
            }
        }
    }

    (stream, consumed)
}
