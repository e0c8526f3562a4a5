//! In-memory topic backend
//!
//! One `tokio::broadcast` channel per topic name. Channels are created on
//! first subscribe and dropped once a publish finds no receivers left, so
//! per-user and per-workspace topics do not accumulate.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::backend::{BroadcastSubscription, TopicBackend};
use super::error::TopicError;

/// In-memory topic backend
#[derive(Clone)]
pub struct MemoryTopicBackend {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
    capacity: usize,
}

impl MemoryTopicBackend {
    /// Create a backend whose channels buffer `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    fn get_or_create(&self, topic: &str) -> broadcast::Sender<Vec<u8>> {
        {
            let channels = self.channels.read();
            if let Some(sender) = channels.get(topic) {
                return sender.clone();
            }
        }

        let mut channels = self.channels.write();
        // Double-check after acquiring write lock
        if let Some(sender) = channels.get(topic) {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(self.capacity);
        channels.insert(topic.to_string(), sender.clone());
        sender
    }
}

#[async_trait]
impl TopicBackend for MemoryTopicBackend {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TopicError> {
        let sender = self.channels.read().get(topic).cloned();
        let Some(sender) = sender else {
            return Ok(());
        };

        if sender.send(payload.to_vec()).is_err() {
            // No receivers left; drop the channel unless someone resubscribed meanwhile
            let mut channels = self.channels.write();
            if channels
                .get(topic)
                .is_some_and(|s| s.receiver_count() == 0)
            {
                channels.remove(topic);
                tracing::trace!(topic, "Dropped idle topic channel");
            }
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BroadcastSubscription, TopicError> {
        let mut receiver = self.get_or_create(topic).subscribe();

        let stream = stream! {
            loop {
                match receiver.recv().await {
                    Ok(payload) => yield Ok(payload),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        yield Err(TopicError::Lagged(n));
                    }
                }
            }
        };

        Ok(BroadcastSubscription {
            receiver: Box::pin(stream),
        })
    }

    fn active_topics(&self) -> usize {
        self.channels.read().len()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let backend = MemoryTopicBackend::new(8);
        backend.publish("user:1", b"hello").await.unwrap();
        assert_eq!(backend.active_topics(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_payload() {
        let backend = MemoryTopicBackend::new(8);
        let mut sub = backend.subscribe("user:1").await.unwrap();

        backend.publish("user:1", b"hello").await.unwrap();

        let received = sub.receiver.next().await.unwrap().unwrap();
        assert_eq!(received, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let backend = MemoryTopicBackend::new(8);
        let mut sub_a = backend.subscribe("workspace:1").await.unwrap();
        let _sub_b = backend.subscribe("workspace:2").await.unwrap();

        backend.publish("workspace:2", b"other").await.unwrap();
        backend.publish("workspace:1", b"mine").await.unwrap();

        let received = sub_a.receiver.next().await.unwrap().unwrap();
        assert_eq!(received, b"mine".to_vec());
    }

    #[tokio::test]
    async fn test_idle_channel_dropped_after_unsubscribe() {
        let backend = MemoryTopicBackend::new(8);
        let sub = backend.subscribe("user:9").await.unwrap();
        assert_eq!(backend.active_topics(), 1);

        drop(sub);
        backend.publish("user:9", b"gone").await.unwrap();
        assert_eq!(backend.active_topics(), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_reports_skip() {
        let backend = MemoryTopicBackend::new(2);
        let mut sub = backend.subscribe("t").await.unwrap();

        for i in 0..5u8 {
            backend.publish("t", &[i]).await.unwrap();
        }

        let first = sub.receiver.next().await.unwrap();
        assert!(matches!(first, Err(TopicError::Lagged(3))));
        let next = sub.receiver.next().await.unwrap().unwrap();
        assert_eq!(next, vec![3]);
    }
}
