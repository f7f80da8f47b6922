use crate::error::ValidationError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use getset::Getters;

#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct Message {
    topic: String,
    payload: Bytes,
}

impl Message {
    pub fn new(topic: &str, payload: impl Into<Bytes>) -> Result<Self, ValidationError> {
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }

        let payload = payload.into();
        if payload.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }

        Ok(Self {
            topic: topic.to_owned(),
            payload,
        })
    }
}

#[derive(Debug, Getters, Copy, Clone, Eq, PartialEq)]
#[getset(get = "pub")]
pub struct PartitionOffset {
    partition: i32,
    offset: i64,
}

impl PartitionOffset {
    pub fn new(partition: i32, offset: i64) -> PartitionOffset {
        Self { offset, partition }
    }
}

#[derive(Debug, Clone)]
pub struct ConsumedRecord {
    pub topic: String,
    pub partition_offset: PartitionOffset,
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: Bytes,
}

impl ConsumedRecord {
    pub fn partition(&self) -> i32 {
        self.partition_offset.partition
    }

    pub fn offset(&self) -> i64 {
        self.partition_offset.offset
    }
}
