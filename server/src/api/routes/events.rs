//! Server-Sent Events stream of realtime change events
//!
//! One connection subscribes to `user:<id>` plus `workspace:<id>` for every
//! active membership held at connect time. EventSource cannot set headers,
//! so a `?token=` query parameter is accepted as well as the bearer header.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::watch;

use crate::api::auth::{AuthState, bearer_token};
use crate::api::types::ApiError;
use crate::core::constants::SSE_KEEP_ALIVE_SECS;
use crate::data::topics::{BroadcastTopicSubscriber, TopicError, TopicService};
use crate::domain::{RealtimeEvent, user_topic, workspace_topic};

#[derive(Clone)]
pub struct EventsState {
    pub auth: AuthState,
    pub topics: Arc<TopicService>,
    pub shutdown_rx: watch::Receiver<bool>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub token: Option<String>,
}

pub fn routes(state: EventsState) -> Router {
    Router::new().route("/", get(events)).with_state(state)
}

/// Turn one topic subscriber into a stream of SSE events
fn topic_stream(
    topic: String,
    mut subscriber: BroadcastTopicSubscriber<RealtimeEvent>,
) -> BoxStream<'static, Event> {
    async_stream::stream! {
        loop {
            match subscriber.recv().await {
                Ok(message) => yield Event::default().event(message.event).data(message.data),
                Err(TopicError::Lagged(n)) => {
                    tracing::warn!(topic = %topic, lagged = n, "SSE subscriber lagged behind");
                }
                Err(TopicError::Serialization(e)) => {
                    tracing::warn!(topic = %topic, error = %e, "Dropping undecodable event");
                }
                Err(TopicError::ChannelClosed) => break,
            }
        }
    }
    .boxed()
}

#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "events",
    params(("token" = Option<String>, Query, description = "Session token when no Authorization header can be sent")),
    responses(
        (status = 200, description = "text/event-stream of change events"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn events(
    State(state): State<EventsState>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let token = bearer_token(&headers)
        .map(str::to_string)
        .or(query.token)
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    let user = state.auth.authenticate(&token).await?;

    let mut topic_names = vec![user_topic(user.user_id)];
    for membership in state
        .auth
        .engine
        .load_workspace_memberships(user.user_id)
        .await?
    {
        topic_names.push(workspace_topic(membership.workspace_id));
    }

    let mut streams = Vec::with_capacity(topic_names.len());
    for name in topic_names {
        let subscriber = state
            .topics
            .broadcast_topic::<RealtimeEvent>(&name)
            .subscribe()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, topic = %name, "Failed to subscribe to topic");
                ApiError::internal("Failed to open event stream")
            })?;
        streams.push(topic_stream(name, subscriber));
    }
    tracing::debug!(user_id = user.user_id, topics = streams.len(), "SSE client connected");

    let mut merged = stream::select_all(streams);
    let mut shutdown_rx = state.shutdown_rx.clone();
    let stream = async_stream::stream! {
        if *shutdown_rx.borrow() {
            return;
        }
        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        yield Ok(Event::default().event("terminate").data("shutdown"));
                        break;
                    }
                }
                next = merged.next() => match next {
                    Some(event) => yield Ok(event),
                    None => break,
                },
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}
