use crate::connection_settings::ConnectionSettings;
use anyhow::Context;
use rdkafka::producer::FutureProducer;
use rdkafka::ClientConfig;
use std::ops::{Deref, DerefMut};

#[derive(Clone)]
pub struct ProducerWrapper {
    producer: FutureProducer,
}

impl ProducerWrapper {
    pub fn create(connection_settings: &ConnectionSettings) -> Result<Self, anyhow::Error> {
        let producer: FutureProducer = producer_config(connection_settings)?
            .create()
            .context("While creating a kafka FutureProducer")?;

        Ok(Self { producer })
    }
}

fn producer_config(connection_settings: &ConnectionSettings) -> Result<ClientConfig, anyhow::Error> {
    // https://raw.githubusercontent.com/confluentinc/librdkafka/master/CONFIGURATION.md
    let mut config = ClientConfig::try_from(connection_settings)?;
    config
        .set("acks", connection_settings.required_acks.to_string())
        .set(
            "message.timeout.ms",
            connection_settings.message_timeout_ms.to_string(),
        )
        .set("linger.ms", "0");

    Ok(config)
}

impl DerefMut for ProducerWrapper {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.producer
    }
}

impl Deref for ProducerWrapper {
    type Target = FutureProducer;

    fn deref(&self) -> &Self::Target {
        &self.producer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_settings::RequiredAcks;

    #[test]
    fn delivery_is_bounded_by_message_timeout() {
        let config = producer_config(&ConnectionSettings::default()).unwrap();

        assert_eq!(config.get("message.timeout.ms"), Some("5000"));
        assert_eq!(config.get("acks"), Some("all"));
    }

    #[test]
    fn message_timeout_and_acks_follow_settings() {
        let settings = ConnectionSettings {
            required_acks: RequiredAcks::Leader,
            message_timeout_ms: 1500,
            ..Default::default()
        };

        let config = producer_config(&settings).unwrap();

        assert_eq!(config.get("message.timeout.ms"), Some("1500"));
        assert_eq!(config.get("acks"), Some("1"));
    }
}
