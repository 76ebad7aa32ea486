//! Broker publishing seam.
//!
//! The relay is the only caller. The real implementation posts to an HTTP
//! bridge in front of the broker; tests use [`MemoryBroker`].

use crate::{OutboxError, OutboxResult};
use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Publishes one message to the broker. Implementations must deliver
/// at-least-once and preserve order for messages sharing a key within one
/// producer.
#[async_trait]
pub trait BrokerPublisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        event_type: &str,
        payload: &[u8],
    ) -> OutboxResult<()>;
}

/// Configuration for the HTTP bridge publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Base URL of the broker bridge.
    pub bridge_url: String,
    /// Optional bearer token for the bridge.
    pub auth_token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bridge_url: "http://localhost:9094".to_string(),
            auth_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishRequest<'a> {
    topic: &'a str,
    key: &'a str,
    event_type: &'a str,
    /// Payload bytes, base64-encoded so the bridge treats them as opaque.
    payload: String,
}

/// Publishes messages to an HTTP bridge in front of the broker.
pub struct HttpPublisher {
    config: PublisherConfig,
    client: reqwest::Client,
}

impl HttpPublisher {
    pub fn new(config: PublisherConfig) -> OutboxResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl BrokerPublisher for HttpPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        event_type: &str,
        payload: &[u8],
    ) -> OutboxResult<()> {
        let url = format!("{}/publish", self.config.bridge_url);
        let request = PublishRequest {
            topic,
            key,
            event_type,
            payload: BASE64.encode(payload),
        };

        debug!(url = %url, topic, key, event_type, "Publishing message");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(token) = &self.config.auth_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutboxError::Publish(format!("HTTP {status}: {body}")));
        }

        Ok(())
    }
}

/// A message captured by [`MemoryBroker`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub event_type: String,
    pub payload: Vec<u8>,
}

/// In-memory broker double. Records publishes in order and can be told to
/// fail the next N publishes to exercise retry paths.
#[derive(Debug, Default)]
pub struct MemoryBroker {
    published: Mutex<Vec<PublishedMessage>>,
    fail_next: AtomicUsize,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` publish calls with a transient error.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// All successfully published messages, in publish order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().expect("lock poisoned").clone()
    }

    /// Publish order of (key, event_type) pairs, for ordering assertions.
    pub fn published_keys(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|m| (m.key.clone(), m.event_type.clone()))
            .collect()
    }
}

#[async_trait]
impl BrokerPublisher for MemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        event_type: &str,
        payload: &[u8],
    ) -> OutboxResult<()> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(OutboxError::Publish("injected broker failure".to_string()));
        }

        self.published
            .lock()
            .expect("lock poisoned")
            .push(PublishedMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                event_type: event_type.to_string(),
                payload: payload.to_vec(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_broker_records_in_order() {
        let broker = MemoryBroker::new();

        broker.publish("t", "k1", "a", b"1").await.unwrap();
        broker.publish("t", "k2", "b", b"2").await.unwrap();

        let published = broker.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].key, "k1");
        assert_eq!(published[1].event_type, "b");
    }

    #[tokio::test]
    async fn test_memory_broker_injected_failures() {
        let broker = MemoryBroker::new();
        broker.fail_next(2);

        assert!(broker.publish("t", "k", "a", b"").await.is_err());
        assert!(broker.publish("t", "k", "a", b"").await.is_err());
        assert!(broker.publish("t", "k", "a", b"").await.is_ok());
        assert_eq!(broker.published().len(), 1);
    }

    #[test]
    fn test_publisher_config_default() {
        let config = PublisherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.auth_token.is_none());
    }
}
