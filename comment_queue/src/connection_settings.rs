mod required_acks;
mod security_protocol;

pub use required_acks::*;
pub use security_protocol::*;

use crate::connection::RetryPolicy;
use anyhow::bail;
use rdkafka::ClientConfig;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub brokers: Vec<String>,
    pub security_protocol: SecurityProtocol,
    pub required_acks: RequiredAcks,
    pub max_connect_attempts: u32,
    pub retry_backoff_ms: u64,
    pub dial_timeout_ms: u64,
    pub message_timeout_ms: u64,
}

impl ConnectionSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_connect_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:29092".to_owned()],
            security_protocol: SecurityProtocol::default(),
            required_acks: RequiredAcks::default(),
            max_connect_attempts: 5,
            retry_backoff_ms: 1000,
            dial_timeout_ms: 5000,
            message_timeout_ms: 5000,
        }
    }
}

impl TryFrom<&ConnectionSettings> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(value: &ConnectionSettings) -> Result<Self, Self::Error> {
        if value.brokers.is_empty() {
            bail!("No brokers specified")
        }

        let mut config = ClientConfig::new();

        let brokers_string = value.brokers.join(",");
        // librdkafka rejects setup timeouts below one second
        let setup_timeout_ms = value.dial_timeout_ms.max(1000);
        config
            .set("bootstrap.servers", brokers_string)
            .set("security.protocol", value.security_protocol.to_string())
            .set(
                "socket.connection.setup.timeout.ms",
                setup_timeout_ms.to_string(),
            );

        if let Ok(value) = std::env::var("RD_KAFKA_DEBUG") {
            config.set("debug", value);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_requires_brokers() {
        let settings = ConnectionSettings {
            brokers: vec![],
            ..Default::default()
        };

        let result = ClientConfig::try_from(&settings);

        assert_eq!(result.unwrap_err().to_string(), "No brokers specified");
    }

    #[test]
    fn client_config_joins_brokers_and_clamps_setup_timeout() {
        let settings = ConnectionSettings {
            brokers: vec!["kafka-1:9092".to_owned(), "kafka-2:9092".to_owned()],
            dial_timeout_ms: 200,
            ..Default::default()
        };

        let config = ClientConfig::try_from(&settings).unwrap();

        assert_eq!(config.get("bootstrap.servers"), Some("kafka-1:9092,kafka-2:9092"));
        assert_eq!(config.get("security.protocol"), Some("plaintext"));
        assert_eq!(config.get("socket.connection.setup.timeout.ms"), Some("1000"));
    }

    #[test]
    fn retry_policy_follows_settings() {
        let settings = ConnectionSettings {
            max_connect_attempts: 3,
            retry_backoff_ms: 250,
            ..Default::default()
        };

        let policy = settings.retry_policy();

        assert_eq!(*policy.max_attempts(), 3);
        assert_eq!(*policy.backoff(), Duration::from_millis(250));
    }
}
