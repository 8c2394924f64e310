//! Realtime delivery of pipeline events to WebSocket subscribers.

mod notifier;

pub use notifier::RealtimeNotifier;
