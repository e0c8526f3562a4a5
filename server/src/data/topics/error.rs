//! Topic error types

use std::fmt;

/// Error type for topic operations
#[derive(Debug)]
pub enum TopicError {
    /// Channel closed (backend shut down)
    ChannelClosed,
    /// Receiver lagged behind and missed messages
    Lagged(u64),
    /// Serialization/deserialization error
    Serialization(String),
}

impl std::error::Error for TopicError {}

impl fmt::Display for TopicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicError::ChannelClosed => write!(f, "channel closed"),
            TopicError::Lagged(n) => write!(f, "receiver lagged by {} messages", n),
            TopicError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl From<tokio::sync::broadcast::error::RecvError> for TopicError {
    fn from(err: tokio::sync::broadcast::error::RecvError) -> Self {
        match err {
            tokio::sync::broadcast::error::RecvError::Closed => TopicError::ChannelClosed,
            tokio::sync::broadcast::error::RecvError::Lagged(n) => TopicError::Lagged(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    #[test]
    fn test_display() {
        assert_eq!(TopicError::Lagged(3).to_string(), "receiver lagged by 3 messages");
        assert_eq!(TopicError::ChannelClosed.to_string(), "channel closed");
    }

    #[test]
    fn test_from_recv_error() {
        assert!(matches!(
            TopicError::from(RecvError::Lagged(7)),
            TopicError::Lagged(7)
        ));
        assert!(matches!(
            TopicError::from(RecvError::Closed),
            TopicError::ChannelClosed
        ));
    }
}
