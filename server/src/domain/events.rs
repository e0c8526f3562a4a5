//! Realtime change events
//!
//! The engine only sees [`EventPublisher`]. [`Broadcaster`] decides which
//! topics an event goes to, and [`TopicEventPublisher`] puts it on the
//! in-process topic bus that SSE connections subscribe to.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::topics::{TopicError, TopicService};

/// Wire envelope carried on `user:<id>` and `workspace:<id>` topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub event: String,
    /// JSON-encoded payload
    pub data: String,
}

pub fn user_topic(user_id: i64) -> String {
    format!("user:{user_id}")
}

pub fn workspace_topic(workspace_id: i64) -> String {
    format!("workspace:{workspace_id}")
}

/// Injected transport for change events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, event: &str, payload: &Value) -> Result<(), TopicError>;
}

/// Publishes onto the topic bus
pub struct TopicEventPublisher {
    topics: Arc<TopicService>,
}

impl TopicEventPublisher {
    pub fn new(topics: Arc<TopicService>) -> Self {
        Self { topics }
    }
}

#[async_trait]
impl EventPublisher for TopicEventPublisher {
    async fn publish(&self, topic: &str, event: &str, payload: &Value) -> Result<(), TopicError> {
        let data =
            serde_json::to_string(payload).map_err(|e| TopicError::Serialization(e.to_string()))?;
        self.topics
            .broadcast_topic::<RealtimeEvent>(topic)
            .publish(&RealtimeEvent {
                event: event.to_string(),
                data,
            })
            .await
    }
}

/// A change worth telling connected clients about, with the data its routing needs
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    TaskCreated {
        workspace_id: Option<i64>,
        user_ids: Vec<i64>,
    },
    TaskUpdated {
        workspace_id: Option<i64>,
        assignee_ids: Vec<i64>,
    },
    TaskDeleted {
        workspace_id: Option<i64>,
    },
    TaskAssignmentChanged {
        workspace_id: Option<i64>,
        assignee_ids: Vec<i64>,
    },
    CommentAdded {
        workspace_id: Option<i64>,
        author_id: i64,
    },
    CommentUpdated {
        workspace_id: Option<i64>,
        author_id: i64,
    },
    CommentDeleted {
        workspace_id: Option<i64>,
    },
    UndoActionPerformed {
        user_id: i64,
    },
}

impl ChangeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "task_created",
            Self::TaskUpdated { .. } => "task_updated",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::TaskAssignmentChanged { .. } => "task_assignment_changed",
            Self::CommentAdded { .. } => "comment_added",
            Self::CommentUpdated { .. } => "comment_updated",
            Self::CommentDeleted { .. } => "comment_deleted",
            Self::UndoActionPerformed { .. } => "undo_action_performed",
        }
    }

    /// Target topics, workspace first, without duplicates
    pub fn topics(&self) -> Vec<String> {
        let (workspace_id, users): (Option<i64>, &[i64]) = match self {
            Self::TaskCreated {
                workspace_id,
                user_ids,
            } => (*workspace_id, user_ids.as_slice()),
            Self::TaskUpdated {
                workspace_id,
                assignee_ids,
            }
            | Self::TaskAssignmentChanged {
                workspace_id,
                assignee_ids,
            } => (*workspace_id, assignee_ids.as_slice()),
            Self::CommentAdded {
                workspace_id,
                author_id,
            }
            | Self::CommentUpdated {
                workspace_id,
                author_id,
            } => (*workspace_id, std::slice::from_ref(author_id)),
            Self::TaskDeleted { workspace_id } | Self::CommentDeleted { workspace_id } => {
                (*workspace_id, &[][..])
            }
            Self::UndoActionPerformed { user_id } => (None, std::slice::from_ref(user_id)),
        };

        let mut topics = Vec::with_capacity(users.len() + 1);
        if let Some(ws) = workspace_id {
            topics.push(workspace_topic(ws));
        }
        for user_id in users {
            let topic = user_topic(*user_id);
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        topics
    }
}

/// Routes change events to topics. Delivery is best-effort.
#[derive(Clone)]
pub struct Broadcaster {
    publisher: Arc<dyn EventPublisher>,
}

impl Broadcaster {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    pub async fn emit(&self, event: ChangeEvent, payload: Value) {
        let name = event.name();
        for topic in event.topics() {
            if let Err(e) = self.publisher.publish(&topic, name, &payload).await {
                tracing::warn!(error = %e, topic = %topic, event = name, "Failed to publish event");
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingPublisher;
    use super::*;

    #[test]
    fn test_routing_table() {
        let created = ChangeEvent::TaskCreated {
            workspace_id: Some(3),
            user_ids: vec![1, 2, 1],
        };
        assert_eq!(created.topics(), vec!["workspace:3", "user:1", "user:2"]);

        let deleted = ChangeEvent::TaskDeleted { workspace_id: None };
        assert!(deleted.topics().is_empty());

        let comment = ChangeEvent::CommentUpdated {
            workspace_id: None,
            author_id: 7,
        };
        assert_eq!(comment.topics(), vec!["user:7"]);
        assert_eq!(
            ChangeEvent::CommentDeleted {
                workspace_id: Some(2)
            }
            .topics(),
            vec!["workspace:2"]
        );
        assert_eq!(
            ChangeEvent::UndoActionPerformed { user_id: 9 }.topics(),
            vec!["user:9"]
        );
    }

    #[tokio::test]
    async fn test_broadcaster_emits_to_each_topic() {
        let recorder = Arc::new(RecordingPublisher::default());
        let broadcaster = Broadcaster::new(recorder.clone());
        broadcaster
            .emit(
                ChangeEvent::TaskAssignmentChanged {
                    workspace_id: Some(1),
                    assignee_ids: vec![5],
                },
                serde_json::json!({"task_id": 10}),
            )
            .await;

        assert_eq!(
            recorder.routes(),
            vec![
                ("workspace:1".to_string(), "task_assignment_changed".to_string()),
                ("user:5".to_string(), "task_assignment_changed".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_topic_publisher_round_trip() {
        let topics = Arc::new(TopicService::new(8));
        let mut sub = topics
            .broadcast_topic::<RealtimeEvent>("user:4")
            .subscribe()
            .await
            .unwrap();
        let publisher = TopicEventPublisher::new(topics);

        publisher
            .publish("user:4", "undo_action_performed", &serde_json::json!({"undo_id": 1}))
            .await
            .unwrap();
        let got = sub.recv().await.unwrap();
        assert_eq!(got.event, "undo_action_performed");
        assert_eq!(got.data, r#"{"undo_id":1}"#);
    }
}
