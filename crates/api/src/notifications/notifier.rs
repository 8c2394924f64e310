//! Event-to-WebSocket routing loop.
//!
//! [`RealtimeNotifier`] subscribes to the pipeline event bus and pushes
//! each event to every connection subscribed to its query, as a frame
//! of the shape `{channel, query_id, data}` where `channel` is one of
//! `query`, `asset`, or `message`.

use std::sync::Arc;

use axum::extract::ws::Message;
use dreamcut_events::PipelineEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Routes pipeline events to subscribed WebSocket connections.
///
/// Delivery is at-least-once from subscription onward and per-entity in
/// store apply order; there is no replay for late subscribers (they
/// re-fetch the snapshot endpoint instead). When this consumer falls
/// behind the bus and frames are dropped, every connection gets an
/// `error`-channel frame so clients know to resync.
pub struct RealtimeNotifier {
    ws_manager: Arc<WsManager>,
}

impl RealtimeNotifier {
    /// Create a notifier delivering through the given WebSocket manager.
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each
    /// event. When the bus overruns this consumer, every connected
    /// client is told delivery broke so it can re-fetch its snapshot.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](dreamcut_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<PipelineEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.deliver(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Realtime notifier lagged");
                    self.notify_lag(n).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, realtime notifier shutting down");
                    break;
                }
            }
        }
    }

    /// Tell every connected client that frames were dropped.
    ///
    /// Clients treat this as a resync signal: the snapshot endpoint is
    /// the source of truth for anything they missed.
    async fn notify_lag(&self, skipped: u64) {
        let frame = serde_json::json!({
            "channel": "error",
            "reason": "lagged",
            "skipped": skipped,
        })
        .to_string();
        let notified = self
            .ws_manager
            .send_to_all(Message::Text(frame.into()))
            .await;
        tracing::warn!(notified, skipped, "Asked clients to re-fetch their snapshots");
    }

    /// Push one event to every connection subscribed to its query.
    async fn deliver(&self, event: &PipelineEvent) {
        let query_id = event.query_id();
        let frame = match frame_for(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(%query_id, error = %e, "Failed to serialize event frame");
                return;
            }
        };
        let delivered = self
            .ws_manager
            .send_to_query(query_id, Message::Text(frame.into()))
            .await;
        tracing::trace!(%query_id, delivered, "Routed pipeline event");
    }
}

/// Serialize an event into its wire frame.
fn frame_for(event: &PipelineEvent) -> Result<String, serde_json::Error> {
    let (channel, data) = match event {
        PipelineEvent::QueryUpdated { query, .. } => ("query", serde_json::to_value(query)?),
        PipelineEvent::AssetUpdated { asset, .. } => ("asset", serde_json::to_value(asset)?),
        PipelineEvent::MessageAdded { message, .. } => ("message", serde_json::to_value(message)?),
    };
    serde_json::to_string(&serde_json::json!({
        "channel": channel,
        "query_id": event.query_id(),
        "data": data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lag_notice_reaches_every_connection() {
        let manager = Arc::new(WsManager::new());
        // No subscriptions on purpose: delivery-break notices go to
        // every connection regardless.
        let mut rx = manager.add("a".to_string()).await;

        let notifier = RealtimeNotifier::new(Arc::clone(&manager));
        notifier.notify_lag(7).await;

        let Message::Text(frame) = rx.try_recv().unwrap() else {
            panic!("expected a text frame");
        };
        let json: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
        assert_eq!(json["channel"], "error");
        assert_eq!(json["reason"], "lagged");
        assert_eq!(json["skipped"], 7);
    }
}
