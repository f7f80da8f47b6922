use crate::app_config::WorkerConfig;
use anyhow::Context;
use comment_queue::broker::{Broker, KafkaBroker};
use comment_queue::connection::ClientFactory;
use comment_queue::consumer::{ConsumeSummary, ConsumerLoop};
use comment_queue::shutdown::ShutdownCoordinator;
use tracing::info;

pub async fn run_until_stopped(config: WorkerConfig) -> Result<(), anyhow::Error> {
    let shutdown = ShutdownCoordinator::new();
    let listener = shutdown
        .listen_for_signals()
        .context("While installing signal handlers")?;

    let summary = run_with_broker(config, KafkaBroker, &shutdown).await;
    listener.abort();

    let summary = summary?;
    info!("Worker exited, {} message(s) consumed", summary.consumed);
    Ok(())
}

pub async fn run_with_broker<B: Broker>(
    config: WorkerConfig,
    broker: B,
    shutdown: &ShutdownCoordinator,
) -> Result<ConsumeSummary, anyhow::Error> {
    let factory = ClientFactory::new(broker, config.kafka);
    let consumer = ConsumerLoop::new(&config.topic, config.partition);

    consumer
        .run(&factory, shutdown.token())
        .await
        .context("While running consumer")
}
