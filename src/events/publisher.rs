use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::Record;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};

use super::types::topics;

/// Configuration for the Kafka event publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: topics::STATUS.to_string(),
            retry_count: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Kafka publisher for payment status events.
///
/// Publishing is best-effort: the payment path never blocks on Kafka, and
/// callers downgrade failures to a log record.
pub struct EventPublisher {
    config: PublisherConfig,
    client: Option<Arc<rskafka::client::Client>>,
    partition_clients: Arc<RwLock<BTreeMap<String, Arc<PartitionClient>>>>,
}

impl EventPublisher {
    pub fn new(config: PublisherConfig) -> Self {
        Self {
            config,
            client: None,
            partition_clients: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Connects to the Kafka cluster.
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to Kafka brokers: {:?}", self.config.brokers);

        let client = ClientBuilder::new(self.config.brokers.clone())
            .build()
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to connect to Kafka: {e}")))?;

        self.client = Some(Arc::new(client));
        info!("Kafka publisher connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    async fn partition_client(&self, topic: &str) -> Result<Arc<PartitionClient>> {
        {
            let clients = self.partition_clients.read().await;
            if let Some(client) = clients.get(topic) {
                return Ok(client.clone());
            }
        }

        let kafka_client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::Internal(anyhow!("Kafka client not connected")))?;

        let partition_client = kafka_client
            .partition_client(topic.to_string(), 0, UnknownTopicHandling::Retry)
            .await
            .map_err(|e| AppError::Internal(anyhow!("failed to get partition client: {e}")))?;

        let client = Arc::new(partition_client);
        self.partition_clients
            .write()
            .await
            .insert(topic.to_string(), client.clone());

        Ok(client)
    }

    /// Publishes a serializable payload to the configured topic, keyed by
    /// the payment's external reference so per-payment ordering holds.
    pub async fn publish<T: Serialize>(&self, key: Option<&str>, payload: &T) -> Result<i64> {
        let json = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(anyhow!("failed to serialize event: {e}")))?;

        let partition_client = self.partition_client(&self.config.topic).await?;
        let record = Record {
            key: key.map(|k| k.as_bytes().to_vec()),
            value: Some(json),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let mut last_error = None;
        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                warn!(
                    "Retrying Kafka publish, attempt {}/{}",
                    attempt, self.config.retry_count
                );
                tokio::time::sleep(Duration::from_millis(
                    self.config.retry_delay_ms * attempt as u64,
                ))
                .await;
            }

            match partition_client
                .produce(vec![record.clone()], Compression::NoCompression)
                .await
            {
                Ok(offsets) => {
                    let offset = offsets.first().copied().unwrap_or(0);
                    debug!(topic = %self.config.topic, offset, "event published");
                    return Ok(offset);
                }
                Err(e) => {
                    warn!("Failed to publish event: {}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::Internal(anyhow!(
            "failed to publish event after {} retries: {:?}",
            self.config.retry_count,
            last_error
        )))
    }
}
