//! Topic system for realtime fan-out
//!
//! Broadcast topics are fire-and-forget: every subscriber connected at
//! publish time receives the message, later subscribers never see it.
//! Payloads are MessagePack-encoded with `rmp-serde`.

mod backend;
mod error;
mod memory;

use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{BroadcastSubscription, TopicBackend};
pub use error::TopicError;
pub use memory::MemoryTopicBackend;

/// Trait for messages that can be published to topics
pub trait TopicMessage: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> TopicMessage for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Central topic service
pub struct TopicService {
    backend: Arc<dyn TopicBackend>,
}

impl TopicService {
    /// Create a topic service backed by in-process broadcast channels
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_backend(Arc::new(MemoryTopicBackend::new(channel_capacity)))
    }

    pub fn with_backend(backend: Arc<dyn TopicBackend>) -> Self {
        Self { backend }
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Number of topics that currently have live channels
    pub fn active_topics(&self) -> usize {
        self.backend.active_topics()
    }

    /// Get a typed handle to a broadcast topic
    pub fn broadcast_topic<T: TopicMessage>(&self, name: &str) -> BroadcastTopic<T> {
        BroadcastTopic {
            name: name.to_string(),
            backend: Arc::clone(&self.backend),
            _phantom: PhantomData,
        }
    }
}

/// Typed handle to a broadcast topic
pub struct BroadcastTopic<T: TopicMessage> {
    name: String,
    backend: Arc<dyn TopicBackend>,
    _phantom: PhantomData<T>,
}

impl<T: TopicMessage> BroadcastTopic<T> {
    /// Publish a message (fire-and-forget)
    pub async fn publish(&self, msg: &T) -> Result<(), TopicError> {
        let payload =
            rmp_serde::to_vec(msg).map_err(|e| TopicError::Serialization(e.to_string()))?;
        self.backend.publish(&self.name, &payload).await
    }

    /// Subscribe to broadcast messages
    pub async fn subscribe(&self) -> Result<BroadcastTopicSubscriber<T>, TopicError> {
        let subscription = self.backend.subscribe(&self.name).await?;
        Ok(BroadcastTopicSubscriber {
            subscription,
            _phantom: PhantomData,
        })
    }

    /// Get the topic name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Subscriber to a broadcast topic
pub struct BroadcastTopicSubscriber<T: TopicMessage> {
    subscription: BroadcastSubscription,
    _phantom: PhantomData<T>,
}

impl<T: TopicMessage> BroadcastTopicSubscriber<T> {
    /// Receive the next message
    pub async fn recv(&mut self) -> Result<T, TopicError> {
        match self.subscription.receiver.next().await {
            Some(result) => {
                let payload = result?;
                rmp_serde::from_slice(&payload).map_err(|e| TopicError::Serialization(e.to_string()))
            }
            None => Err(TopicError::ChannelClosed),
        }
    }
}
