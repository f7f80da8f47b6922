use anyhow::Context;
use comment_queue::connection_settings::ConnectionSettings;
use config::Config;
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default)]
    pub kafka: ConnectionSettings,
}

fn default_topic() -> String {
    "comments".to_owned()
}

impl AppConfig {
    pub fn build() -> Result<Self, anyhow::Error> {
        let config = Config::builder()
            .add_source(config::File::with_name("appsettings").required(false))
            .add_source(
                config::Environment::with_prefix("App")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("kafka.brokers")
                    .try_parsing(true),
            )
            .build()
            .context("While building config")?;

        let deserialized_config = config
            .try_deserialize()
            .context("While deserializing config")?;

        info!("App config: {deserialized_config:?}");

        Ok(deserialized_config)
    }
}
