use crate::message::ConsumedRecord;
use tracing::info;

pub trait RecordSink: Send + 'static {
    fn handle(&mut self, sequence: u64, record: &ConsumedRecord);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogRecordSink;

impl RecordSink for LogRecordSink {
    fn handle(&mut self, sequence: u64, record: &ConsumedRecord) {
        info!(
            sequence,
            topic = %record.topic,
            partition = record.partition(),
            offset = record.offset(),
            timestamp = ?record.timestamp,
            payload = %String::from_utf8_lossy(&record.payload),
            "Message {} received",
            sequence
        );
    }
}
