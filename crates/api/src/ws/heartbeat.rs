use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Interval between heartbeat pings (in seconds).
///
/// Asset analysis can sit on a slow model call for a while; pinging
/// keeps intermediaries from reaping progress streams that are quiet
/// between pipeline events.
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn the background task that pings all open progress streams.
///
/// Ticks are skipped while nobody is connected. The returned
/// `JoinHandle` is aborted during shutdown, after the manager has
/// closed its connections.
pub fn start_heartbeat(ws_manager: Arc<WsManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let count = ws_manager.connection_count().await;
            if count == 0 {
                continue;
            }
            tracing::debug!(count, "Pinging progress streams");
            ws_manager.ping_all().await;
        }
    })
}
