use crate::broker::Broker;
use crate::connection::connect_with_retry;
use crate::connection_settings::ConnectionSettings;
use crate::error::ConnectionError;
use tracing::debug;

pub struct ClientFactory<B> {
    broker: B,
    settings: ConnectionSettings,
}

impl<B: Broker> ClientFactory<B> {
    pub fn new(broker: B, settings: ConnectionSettings) -> Self {
        Self { broker, settings }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub async fn connect_producer(&self) -> Result<B::Producer, ConnectionError> {
        self.ensure_brokers()?;
        connect_with_retry(&self.settings.retry_policy(), |attempt| {
            debug!("Opening producer session, attempt {}", attempt);
            self.broker.open_producer(&self.settings)
        })
        .await
    }

    pub async fn connect_consumer(&self) -> Result<B::Consumer, ConnectionError> {
        self.ensure_brokers()?;
        connect_with_retry(&self.settings.retry_policy(), |attempt| {
            debug!("Opening consumer session, attempt {}", attempt);
            self.broker.open_consumer(&self.settings)
        })
        .await
    }

    fn ensure_brokers(&self) -> Result<(), ConnectionError> {
        if self.settings.brokers.is_empty() {
            return Err(ConnectionError::NoBrokers);
        }
        Ok(())
    }
}
