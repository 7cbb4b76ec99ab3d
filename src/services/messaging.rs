//! Simulated message producer.
//!
//! Publishing never leaves the process; it returns the receipt a real
//! broker would have produced and logs the event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::MessagingConfig;

/// Receipt for a published message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Published {
    pub message_id: Uuid,
    pub topic: String,
    pub key: Option<String>,
    pub broker: &'static str,
    pub offset: u64,
}

/// Dependency status reported by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagingHealth {
    pub status: &'static str,
    pub brokers: String,
}

#[derive(Clone)]
pub struct MessageService {
    topic: String,
    brokers: String,
    next_offset: Arc<AtomicU64>,
}

impl MessageService {
    pub fn new(config: &MessagingConfig) -> Self {
        Self {
            topic: config.topic.clone(),
            brokers: config.brokers.clone(),
            next_offset: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish to `topic`, or the configured topic when none is given.
    pub fn publish(
        &self,
        topic: Option<&str>,
        key: Option<&str>,
        message: &str,
        trace_id: Option<&str>,
    ) -> Published {
        let published = Published {
            message_id: Uuid::new_v4(),
            topic: topic.unwrap_or(&self.topic).to_string(),
            key: key.map(str::to_string),
            broker: "kafka-cluster",
            offset: self.next_offset.fetch_add(1, Ordering::Relaxed),
        };

        tracing::info!(
            topic = %published.topic,
            message_id = %published.message_id,
            offset = published.offset,
            trace_id = trace_id.unwrap_or("none"),
            bytes = message.len(),
            "Message published"
        );

        published
    }

    pub fn health(&self) -> MessagingHealth {
        MessagingHealth {
            status: "UP",
            brokers: self.brokers.clone(),
        }
    }
}
