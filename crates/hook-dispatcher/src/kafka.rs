// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Kafka-backed [`Subscriber`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{Headers, Message};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::KafkaConfig;
use crate::consumer::{consume, Record, RecordSource};
use crate::error::SubscribeError;
use crate::subscriber::{MessageHandler, Subscriber};

pub struct KafkaSubscriber {
    config: KafkaConfig,
    cancel: CancellationToken,
    consumers: TaskTracker,
}

impl KafkaSubscriber {
    /// Consumers created by this subscriber stop pulling records once
    /// `cancel` fires.
    pub fn new(config: &KafkaConfig, cancel: CancellationToken) -> Self {
        Self {
            config: config.clone(),
            cancel,
            consumers: TaskTracker::new(),
        }
    }

    fn create_consumer(&self) -> Result<StreamConsumer, SubscribeError> {
        info!(
            brokers = %self.config.address,
            group = %self.config.group_name,
            "Initializing Kafka consumer"
        );

        ClientConfig::new()
            .set("bootstrap.servers", &self.config.address)
            .set("group.id", &self.config.group_name)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .create()
            .map_err(|e| SubscribeError::Client(e.to_string()))
    }
}

#[async_trait]
impl Subscriber for KafkaSubscriber {
    async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), SubscribeError> {
        let consumer = self.create_consumer()?;
        consumer
            .subscribe(&[topic])
            .map_err(|e| SubscribeError::Topic {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        self.consumers
            .spawn(consume(KafkaRecords(consumer), handler, self.cancel.clone()));
        Ok(())
    }

    async fn shutdown(&self) {
        self.consumers.close();
        self.consumers.wait().await;
        debug!("Kafka consumers drained");
    }
}

struct KafkaRecords(StreamConsumer);

#[async_trait]
impl RecordSource for KafkaRecords {
    type Error = KafkaError;

    async fn recv(&mut self) -> Result<Record, KafkaError> {
        let message = self.0.recv().await?;
        Ok(Record {
            payload: message.payload().unwrap_or_default().to_vec(),
            headers: message.headers().map(header_map).unwrap_or_default(),
        })
    }
}

// Values are decoded lossily; a repeated key keeps its last value.
fn header_map<H: Headers>(headers: &H) -> HashMap<String, String> {
    headers
        .iter()
        .map(|header| {
            let value = header
                .value
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .unwrap_or_default();
            (header.key.to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdkafka::message::{Header, OwnedHeaders};

    #[test]
    fn test_header_map() {
        let headers = OwnedHeaders::new()
            .insert(Header {
                key: "User-Agent",
                value: Some("Robot-Gitee-Access"),
            })
            .insert(Header {
                key: "X-Empty",
                value: None::<&str>,
            });

        let map = header_map(&headers);
        assert_eq!(map.len(), 2);
        assert_eq!(map["User-Agent"], "Robot-Gitee-Access");
        assert_eq!(map["X-Empty"], "");
    }

    #[tokio::test]
    async fn test_shutdown_without_subscription_returns() {
        let subscriber = KafkaSubscriber::new(&KafkaConfig::default(), CancellationToken::new());
        tokio::time::timeout(std::time::Duration::from_secs(1), subscriber.shutdown())
            .await
            .expect("shutdown with no consumers should return immediately");
    }
}
