use comment_queue::broker::MemoryBroker;
use comment_queue::connection::ClientFactory;
use comment_queue::connection_settings::ConnectionSettings;
use comment_queue::consumer::{ConsumeSummary, ConsumerLoop, LoopState, RecordSink};
use comment_queue::message::ConsumedRecord;
use comment_queue::producer::Publisher;
use comment_queue::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

struct Collect(mpsc::UnboundedSender<(u64, ConsumedRecord)>);

impl RecordSink for Collect {
    fn handle(&mut self, sequence: u64, record: &ConsumedRecord) {
        let _ = self.0.send((sequence, record.clone()));
    }
}

fn factory(broker: &MemoryBroker) -> Arc<ClientFactory<MemoryBroker>> {
    let settings = ConnectionSettings {
        max_connect_attempts: 3,
        retry_backoff_ms: 10,
        ..Default::default()
    };
    Arc::new(ClientFactory::new(broker.clone(), settings))
}

#[tokio::test]
async fn published_comment_reaches_the_worker() -> Result<(), Box<dyn std::error::Error>> {
    let broker = MemoryBroker::new();
    let factory = factory(&broker);
    let publisher = Publisher::new(factory.clone());

    let payload = serde_json::to_vec(&serde_json::json!({ "text": "hello" }))?;
    let stored = publisher.publish("comments", payload).await?;
    assert_eq!((*stored.partition(), *stored.offset()), (0, 0));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let consumer = ConsumerLoop::with_sink("comments", 0, Collect(tx));
    let coordinator = ShutdownCoordinator::new();

    let observe = async {
        let observed = rx.recv().await;
        coordinator.trigger();
        observed
    };
    let (observed, summary) = timeout(Duration::from_secs(5), async {
        tokio::join!(observe, consumer.run(&factory, coordinator.token()))
    })
    .await?;

    let (sequence, record) = observed.ok_or("sink dropped before a record arrived")?;
    assert_eq!(sequence, 1);
    assert_eq!(record.topic, "comments");
    assert_eq!(record.offset(), 0);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&record.payload)?,
        serde_json::json!({ "text": "hello" })
    );
    assert_eq!(summary?, ConsumeSummary { consumed: 1 });

    Ok(())
}

#[tokio::test]
async fn records_are_observed_in_publish_order() -> Result<(), Box<dyn std::error::Error>> {
    const COUNT: u64 = 25;

    let broker = MemoryBroker::new();
    let factory = factory(&broker);
    let publisher = Publisher::new(factory.clone());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let consumer = ConsumerLoop::with_sink("comments", 0, Collect(tx));
    let mut state = consumer.state();
    let coordinator = ShutdownCoordinator::new();

    let drive = async {
        state.wait_for(|s| *s == LoopState::Running).await?;
        for i in 0..COUNT {
            publisher.publish("comments", format!("comment-{i}")).await?;
        }

        let mut observed = vec![];
        while (observed.len() as u64) < COUNT {
            let Some(item) = rx.recv().await else { break };
            observed.push(item);
        }
        coordinator.trigger();
        Ok::<_, Box<dyn std::error::Error>>(observed)
    };
    let (observed, summary) = timeout(Duration::from_secs(10), async {
        tokio::join!(drive, consumer.run(&factory, coordinator.token()))
    })
    .await?;

    let observed = observed?;
    assert_eq!(observed.len() as u64, COUNT);
    for (index, (sequence, record)) in observed.iter().enumerate() {
        assert_eq!(*sequence, index as u64 + 1);
        assert_eq!(record.offset(), index as i64);
        assert_eq!(record.payload, format!("comment-{index}").as_bytes());
    }
    assert_eq!(summary?.consumed, COUNT);
    assert_eq!(*state.borrow(), LoopState::Stopped);

    Ok(())
}

#[tokio::test]
async fn independent_loops_keep_their_own_counts() -> Result<(), Box<dyn std::error::Error>> {
    let broker = MemoryBroker::new();
    let factory = factory(&broker);
    let publisher = Publisher::new(factory.clone());

    publisher.publish("comments", "a").await?;
    publisher.publish("comments", "b").await?;
    publisher.publish("audit", "c").await?;

    let (comments_tx, mut comments_rx) = mpsc::unbounded_channel();
    let (audit_tx, mut audit_rx) = mpsc::unbounded_channel();
    let comments = ConsumerLoop::with_sink("comments", 0, Collect(comments_tx));
    let audit = ConsumerLoop::with_sink("audit", 0, Collect(audit_tx));
    let coordinator = ShutdownCoordinator::new();

    let wait = async {
        comments_rx.recv().await;
        comments_rx.recv().await;
        audit_rx.recv().await;
        coordinator.trigger();
    };
    let (_, comments_summary, audit_summary) = timeout(Duration::from_secs(5), async {
        tokio::join!(
            wait,
            comments.run(&factory, coordinator.token()),
            audit.run(&factory, coordinator.token())
        )
    })
    .await?;

    assert_eq!(comments_summary?.consumed, 2);
    assert_eq!(audit_summary?.consumed, 1);

    Ok(())
}
