use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use dreamcut_core::types::{EntityId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Query ids this connection wants progress frames for.
    pub subscriptions: HashSet<EntityId>,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections and their subscriptions.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender: tx,
            subscriptions: HashSet::new(),
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Subscribe a connection to a query's progress frames.
    ///
    /// Frames published before the subscription are never replayed;
    /// clients re-fetch the snapshot endpoint to catch up.
    pub async fn subscribe(&self, conn_id: &str, query_id: EntityId) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.subscriptions.insert(query_id);
        }
    }

    /// Remove a connection's subscription to a query.
    pub async fn unsubscribe(&self, conn_id: &str, query_id: EntityId) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.subscriptions.remove(&query_id);
        }
    }

    /// Send a message to every connection subscribed to the query.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_query(&self, query_id: EntityId, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.subscriptions.contains(&query_id) {
                let _ = conn.sender.send(message.clone());
                count += 1;
            }
        }
        count
    }

    /// Send a message to every connection, subscribed or not.
    ///
    /// Used for delivery-break notices that every consumer must see.
    /// Returns the number of connections addressed.
    pub async fn send_to_all(&self, message: Message) -> usize {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(message.clone());
        }
        conns.len()
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_only_reach_subscribed_connections() {
        let manager = WsManager::new();
        let mut rx_a = manager.add("a".to_string()).await;
        let mut rx_b = manager.add("b".to_string()).await;

        let query_id = uuid::Uuid::now_v7();
        manager.subscribe("a", query_id).await;

        let sent = manager
            .send_to_query(query_id, Message::Text("hello".into()))
            .await;
        assert_eq!(sent, 1);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let manager = WsManager::new();
        let mut rx = manager.add("a".to_string()).await;

        let query_id = uuid::Uuid::now_v7();
        manager.subscribe("a", query_id).await;
        manager.unsubscribe("a", query_id).await;

        let sent = manager
            .send_to_query(query_id, Message::Text("hello".into()))
            .await;
        assert_eq!(sent, 0);
        assert!(rx.try_recv().is_err());
    }
}
