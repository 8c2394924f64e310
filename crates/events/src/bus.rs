//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PipelineEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use dreamcut_core::types::EntityId;
use dreamcut_db::models::{Asset, Message, Query};
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// A row-change event on one of the three pipeline tables.
///
/// Events are published by [`ProgressStore`](crate::ProgressStore)
/// immediately after the corresponding row mutation succeeds, so
/// subscribers observe per-entity changes in store apply order. The
/// serialized form carries a `channel` tag (`query` / `asset` /
/// `message`) matching the three logical subscription channels.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The query row itself changed (created, stage advanced, terminal).
    #[serde(rename = "query")]
    QueryUpdated { query_id: EntityId, query: Query },

    /// One asset row of the query changed.
    #[serde(rename = "asset")]
    AssetUpdated { query_id: EntityId, asset: Asset },

    /// A narration message was appended.
    #[serde(rename = "message")]
    MessageAdded { query_id: EntityId, message: Message },
}

impl PipelineEvent {
    /// The query this event belongs to.
    pub fn query_id(&self) -> EntityId {
        match self {
            Self::QueryUpdated { query_id, .. }
            | Self::AssetUpdated { query_id, .. }
            | Self::MessageAdded { query_id, .. } => *query_id,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PipelineEvent`].
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the rows themselves are already durable, and late consumers
    /// re-fetch full state instead of replaying events.
    pub fn publish(&self, event: PipelineEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use dreamcut_core::status::MessageType;
    use dreamcut_db::models::Message;

    fn message_event(query_id: EntityId, content: &str) -> PipelineEvent {
        PipelineEvent::MessageAdded {
            query_id,
            message: Message {
                id: uuid::Uuid::now_v7(),
                query_id,
                message_type: MessageType::Status,
                content: content.to_string(),
                emoji: None,
                asset_id: None,
                data: serde_json::json!({}),
                created_at: chrono::Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let query_id = uuid::Uuid::now_v7();
        bus.publish(message_event(query_id, "starting"));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.query_id(), query_id);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let query_id = uuid::Uuid::now_v7();
        bus.publish(message_event(query_id, "fan-out"));

        assert_eq!(rx1.recv().await.unwrap().query_id(), query_id);
        assert_eq!(rx2.recv().await.unwrap().query_id(), query_id);
    }

    #[tokio::test]
    async fn late_subscriber_sees_subsequent_events_only() {
        let bus = EventBus::default();
        let query_id = uuid::Uuid::now_v7();
        bus.publish(message_event(query_id, "before"));

        let mut rx = bus.subscribe();
        bus.publish(message_event(query_id, "after"));

        let received = rx.recv().await.unwrap();
        let PipelineEvent::MessageAdded { message, .. } = received else {
            panic!("expected a message event");
        };
        assert_eq!(message.content, "after");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(message_event(uuid::Uuid::now_v7(), "orphan"));
    }

    #[test]
    fn event_serializes_with_channel_tag() {
        let event = message_event(uuid::Uuid::now_v7(), "hello");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["channel"], "message");
        assert_eq!(json["message"]["content"], "hello");
    }
}
