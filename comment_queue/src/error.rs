use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Topic must not be empty")]
    EmptyTopic,
    #[error("Payload must not be empty")]
    EmptyPayload,
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("No brokers specified")]
    NoBrokers,
    #[error("Broker unreachable after {attempts} attempt(s)")]
    Exhausted {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("While opening partition {partition} of topic {topic}")]
    Partition {
        topic: String,
        partition: i32,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Broker did not acknowledge message for topic {topic}")]
    Send {
        topic: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
#[error("Error while consuming partition: {error:#}")]
pub struct ConsumeError {
    pub error: anyhow::Error,
}

impl ConsumeError {
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsumerLoopError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Consumer task exited without confirming shutdown")]
    Aborted,
}
