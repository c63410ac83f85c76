//! Kafka record sink
//!
//! Publishes each record's envelope keyed by its id string and waits for the
//! broker's delivery report before returning, so a slow broker slows the poll
//! loop instead of growing an in-memory queue.

use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use search_poller::{FetchedRecord, RecordSink, SinkFuture};
use tracing::{debug, info};

use crate::config::KafkaConfig;
use crate::error::Result;

const SINK_NAME: &str = "kafka";

/// Topic producer for record envelopes.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
    timeout: Duration,
    delivered: u64,
}

impl KafkaSink {
    /// Create the producer. Brokers are contacted lazily on first publish.
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set(
                "message.timeout.ms",
                config.message_timeout.as_millis().to_string(),
            )
            .create()?;
        info!(brokers = %config.brokers, topic = %config.topic, "Kafka producer created");
        Ok(Self {
            producer,
            topic: config.topic.clone(),
            timeout: config.message_timeout,
            delivered: 0,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Records acknowledged by the broker so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// Message value for a record: the JSON envelope.
pub fn payload(record: &FetchedRecord) -> serde_json::Result<String> {
    serde_json::to_string(&record.envelope())
}

fn sink_error(message: impl ToString) -> search_poller::Error {
    search_poller::Error::Sink {
        sink: SINK_NAME.to_string(),
        message: message.to_string(),
    }
}

impl RecordSink for KafkaSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn publish<'a>(&'a mut self, record: &'a FetchedRecord) -> SinkFuture<'a> {
        Box::pin(async move {
            let payload = payload(record)?;
            let message = FutureRecord::to(&self.topic)
                .key(&record.id_str)
                .payload(&payload);

            match self.producer.send(message, self.timeout).await {
                Ok(_) => {
                    self.delivered += 1;
                    debug!(id = %record.id_str, topic = %self.topic, "record delivered");
                    Ok(())
                }
                Err((e, _message)) => Err(sink_error(format!(
                    "delivery of {} to {} failed: {e}",
                    record.id_str, self.topic
                ))),
            }
        })
    }

    fn flush(&mut self) -> SinkFuture<'_> {
        Box::pin(async move {
            let producer = self.producer.clone();
            let timeout = self.timeout;
            // librdkafka's flush blocks the calling thread
            tokio::task::spawn_blocking(move || producer.flush(timeout))
                .await
                .map_err(sink_error)?
                .map_err(sink_error)?;
            debug!(delivered = self.delivered, "Kafka producer flushed");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> KafkaConfig {
        KafkaConfig {
            brokers: "127.0.0.1:1".into(),
            topic: "ingest.twitter".into(),
            message_timeout: Duration::from_millis(5000),
        }
    }

    #[test]
    fn payload_is_the_record_envelope() {
        let record = FetchedRecord::from_value(json!({
            "id": 42,
            "id_str": "42",
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "user": {"screen_name": "alice"},
            "full_text": "not part of the envelope"
        }))
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&payload(&record).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"id": "42", "url": "https://twitter.com/alice/status/42"})
        );
    }

    #[tokio::test]
    async fn producer_is_created_without_a_reachable_broker() {
        let sink = KafkaSink::new(&config()).unwrap();
        assert_eq!(sink.name(), "kafka");
        assert_eq!(sink.topic(), "ingest.twitter");
        assert_eq!(sink.delivered(), 0);
    }

    #[test]
    fn sink_errors_name_the_sink() {
        let err = sink_error("broker down");
        assert_eq!(err.to_string(), "sink kafka failed: broker down");
    }
}
