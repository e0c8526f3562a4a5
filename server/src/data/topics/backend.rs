//! Topic backend trait definition
//!
//! Broadcast (Pub/Sub) only: fire-and-forget, every active subscriber
//! receives each message, nothing is persisted.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::error::TopicError;

/// Subscription to a broadcast topic
pub struct BroadcastSubscription {
    /// Stream of received messages
    pub receiver: Pin<Box<dyn Stream<Item = Result<Vec<u8>, TopicError>> + Send>>,
}

/// Topic backend trait
///
/// Delivery is best-effort and at-most-once. If a topic has no subscribers
/// at publish time the message is dropped.
#[async_trait]
pub trait TopicBackend: Send + Sync {
    /// Publish message to a topic (fire-and-forget)
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TopicError>;

    /// Subscribe to a topic. Lagging subscribers may miss messages.
    async fn subscribe(&self, topic: &str) -> Result<BroadcastSubscription, TopicError>;

    /// Number of topics with live channels
    fn active_topics(&self) -> usize;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
