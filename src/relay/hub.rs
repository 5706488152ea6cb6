//! The relay hub: owns the connection registry and relays recognized events
//! from one connection to all the others.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::events::EventKind;
use crate::config::AppConfig;
use crate::error::RelayError;
use crate::ws::manager::{ConnectionId, ConnectionReceiver, ConnectionRegistry, Delivery};
use crate::ws::messages::Frame;

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub connections: usize,
    pub connections_accepted: u64,
    pub events_relayed: u64,
    pub events_rejected: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct RelayHub {
    registry: ConnectionRegistry,
    echo_to_sender: bool,
    connections_accepted: AtomicU64,
    events_relayed: AtomicU64,
    events_rejected: AtomicU64,
    started_at: DateTime<Utc>,
}

impl RelayHub {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(config.send_queue_capacity),
            echo_to_sender: config.echo_to_sender,
            connections_accepted: AtomicU64::new(0),
            events_relayed: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Register a freshly upgraded connection. It receives broadcasts from
    /// now on through the returned queue.
    pub async fn on_connect(&self) -> (ConnectionId, ConnectionReceiver) {
        let (id, rx) = self.registry.register().await;
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        info!(connection_id = id, "client connected");
        (id, rx)
    }

    /// Remove a connection. Safe to call more than once.
    pub async fn on_disconnect(&self, id: ConnectionId) {
        if self.registry.unregister(id).await {
            info!(connection_id = id, "client disconnected");
        }
    }

    /// Relay an event received from `origin` (or from the HTTP API when
    /// `origin` is `None`) to the other connections.
    ///
    /// Returns how many connections the event was queued for. Unknown
    /// names, payloads that fail the event's forward rule and events from
    /// a connection that has already been removed are not relayed.
    pub async fn dispatch(
        &self,
        origin: Option<ConnectionId>,
        event: &str,
        args: Vec<Value>,
    ) -> Result<Delivery, RelayError> {
        if let Some(id) = origin {
            if !self.registry.contains(id).await {
                debug!(event, connection_id = id, "dropping event from removed connection");
                return Err(RelayError::Connection(format!(
                    "connection {id} is no longer registered"
                )));
            }
        }

        let Some(kind) = EventKind::from_name(event) else {
            debug!(event, ?origin, "ignoring unrecognized event");
            return Err(RelayError::UnknownEvent(event.to_string()));
        };

        let args = match kind.forward(args) {
            Ok(args) => args,
            Err(err) => {
                self.events_rejected.fetch_add(1, Ordering::Relaxed);
                warn!(event = %kind, ?origin, "rejected event: {err}");
                return Err(err);
            }
        };

        info!(event = %kind, ?origin, "{kind}: {}", kind.summary(&args));

        let except = if self.echo_to_sender { None } else { origin };
        let delivery = self
            .registry
            .broadcast(Frame::new(kind.as_str(), args), except)
            .await;
        self.events_relayed.fetch_add(1, Ordering::Relaxed);

        debug!(
            event = %kind,
            delivered = delivery.delivered,
            evicted = delivery.evicted,
            "event relayed"
        );
        Ok(delivery)
    }

    /// Send a frame to a single connection (pong, error notices).
    pub async fn reply(&self, id: ConnectionId, frame: Frame) -> bool {
        self.registry.send_to(id, frame).await
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn stats(&self) -> HubStats {
        HubStats {
            connections: self.registry.len().await,
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            events_relayed: self.events_relayed.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            started_at: self.started_at,
        }
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::events::ForwardRule;
    use serde_json::json;

    #[tokio::test]
    async fn chat_message_reaches_everyone_but_sender() {
        let hub = RelayHub::default();
        let (a, mut rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;
        let (_c, mut rx_c) = hub.on_connect().await;

        let msg = json!({"user": "alice", "message": "hi"});
        let delivery = hub
            .dispatch(Some(a), "chatMessage", vec![msg.clone()])
            .await
            .unwrap();
        assert_eq!(delivery.delivered, 2);

        for rx in [&mut rx_b, &mut rx_c] {
            let frame = rx.recv().await.unwrap();
            assert_eq!(frame.event, "chatMessage");
            assert_eq!(frame.args, vec![msg.clone()]);
        }
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_event_is_relayed_unchanged() {
        let hub = RelayHub::default();
        let (a, _rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;

        let record = json!({"id": "s1", "login": "x"});
        for kind in EventKind::ALL {
            let args = vec![json!([record.clone()]), json!(3)];
            hub.dispatch(Some(a), kind.as_str(), args.clone()).await.unwrap();
            let frame = rx_b.recv().await.unwrap();
            assert_eq!(frame.event, kind.as_str());

            let expected = match kind.forward_rule() {
                ForwardRule::UnwrapFirst => vec![record.clone()],
                ForwardRule::PassThrough => args,
            };
            assert_eq!(frame.args, expected, "{kind}");
        }
    }

    #[tokio::test]
    async fn removed_connection_cannot_dispatch() {
        let hub = RelayHub::default();
        let (a, rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;
        let removed = rx_a.removed();

        hub.on_disconnect(a).await;
        assert!(removed.is_cancelled());

        let err = hub
            .dispatch(Some(a), "chatMessage", vec![json!({"user": "ghost", "message": "boo"})])
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Connection(_)));
        assert!(rx_b.try_recv().is_err());
        assert_eq!(hub.stats().await.events_relayed, 0);
    }

    #[tokio::test]
    async fn stream_start_is_unwrapped() {
        let hub = RelayHub::default();
        let (a, _rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;

        hub.dispatch(Some(a), "streamStart", vec![json!([{"id": "s1"}])])
            .await
            .unwrap();
        let frame = rx_b.recv().await.unwrap();
        assert_eq!(frame.args, vec![json!({"id": "s1"})]);
    }

    #[tokio::test]
    async fn echo_policy_includes_sender() {
        let config = AppConfig {
            echo_to_sender: true,
            ..AppConfig::default()
        };
        let hub = RelayHub::new(&config);
        let (a, mut rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;

        hub.dispatch(Some(a), "playAudio", vec![json!("airhorn")]).await.unwrap();
        assert_eq!(rx_a.recv().await.unwrap().event, "playAudio");
        assert_eq!(rx_b.recv().await.unwrap().event, "playAudio");
    }

    #[tokio::test]
    async fn missing_unwrap_argument_is_rejected_without_broadcast() {
        let hub = RelayHub::default();
        let (a, _rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;

        let err = hub.dispatch(Some(a), "lastFollower", vec![]).await.unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload { .. }));
        assert!(rx_b.try_recv().is_err());

        let stats = hub.stats().await;
        assert_eq!(stats.events_rejected, 1);
        assert_eq!(stats.events_relayed, 0);
    }

    #[tokio::test]
    async fn unknown_event_is_not_relayed() {
        let hub = RelayHub::default();
        let (a, _rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;

        let err = hub.dispatch(Some(a), "selfDestruct", vec![]).await.unwrap_err();
        assert!(matches!(err, RelayError::UnknownEvent(ref name) if name == "selfDestruct"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn dispatch_with_no_connections_is_silent() {
        let hub = RelayHub::default();
        let delivery = hub.dispatch(None, "streamEnd", vec![]).await.unwrap();
        assert_eq!(delivery, Delivery::default());
    }

    #[tokio::test]
    async fn disconnect_mid_stream_does_not_block_others() {
        let hub = RelayHub::default();
        let (a, _rx_a) = hub.on_connect().await;
        let (_b, rx_b) = hub.on_connect().await;
        let (c, mut rx_c) = hub.on_connect().await;

        drop(rx_b);
        hub.on_disconnect(c).await;
        let (_d, mut rx_d) = hub.on_connect().await;

        let delivery = hub.dispatch(Some(a), "emote", vec![json!("kappa.png")]).await.unwrap();
        assert_eq!(delivery, Delivery { delivered: 1, evicted: 1 });
        assert_eq!(rx_d.recv().await.unwrap().args, vec![json!("kappa.png")]);
        assert!(rx_c.recv().await.is_none());
        assert_eq!(hub.connection_count().await, 2);
    }

    #[tokio::test]
    async fn stats_count_connections_and_events() {
        let hub = RelayHub::default();
        let (a, _rx_a) = hub.on_connect().await;
        let (b, _rx_b) = hub.on_connect().await;
        hub.dispatch(Some(a), "viewerCount", vec![json!(10)]).await.unwrap();
        hub.on_disconnect(b).await;
        hub.on_disconnect(b).await;

        let stats = hub.stats().await;
        assert_eq!(stats.connections, 1);
        assert_eq!(stats.connections_accepted, 2);
        assert_eq!(stats.events_relayed, 1);
    }

    #[tokio::test]
    async fn reply_goes_to_one_connection() {
        let hub = RelayHub::default();
        let (a, mut rx_a) = hub.on_connect().await;
        let (_b, mut rx_b) = hub.on_connect().await;

        assert!(hub.reply(a, Frame::pong()).await);
        assert_eq!(rx_a.recv().await.unwrap().event, "pong");
        assert!(rx_b.try_recv().is_err());
    }
}
