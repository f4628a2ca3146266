use std::sync::Arc;

use feed_engine::ConsistencyListener;
use match_engine::events::EventSink;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use types::events::OutboundEvent;

/// Publishes match-engine events on a tokio broadcast channel
pub struct BroadcastSink {
    tx: broadcast::Sender<OutboundEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: OutboundEvent) {
        let event_id = event.event_id();
        if self.tx.send(event).is_err() {
            debug!(event_id = %event_id, "No subscribers for outbound event");
        }
    }
}

/// Feed the gateway's own outbound events back into its listener
///
/// A lagging receiver skips events; feeds still converge because swipes
/// remove targets directly and exclusions are recomputed on the next miss.
pub fn spawn_listener_forwarder(
    mut rx: broadcast::Receiver<OutboundEvent>,
    listener: Arc<ConsistencyListener>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = listener.handle(event.to_inbound()).await {
                        error!(event_id = %event.event_id(), error = %e, "Forwarded event failed");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Listener forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
