//! Connection registry: tracks every open WebSocket connection and fans
//! frames out to them through bounded per-connection queues.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::messages::Frame;

/// A unique ID assigned to each connection when its handshake completes.
pub type ConnectionId = u64;

/// Frames are shared between all recipients of a broadcast.
pub type OutboundFrame = Arc<Frame>;

/// Registry side of a connection: the queue's sending half plus the token
/// that tells the session it has been removed.
#[derive(Debug)]
struct ConnectionHandle {
    tx: mpsc::Sender<OutboundFrame>,
    removed: CancellationToken,
}

/// Session side of a connection, owned by its handler.
#[derive(Debug)]
pub struct ConnectionReceiver {
    rx: mpsc::Receiver<OutboundFrame>,
    removed: CancellationToken,
}

impl ConnectionReceiver {
    /// Next queued frame; `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<OutboundFrame, TryRecvError> {
        self.rx.try_recv()
    }

    /// Cancelled as soon as the registry drops this connection, whether by
    /// eviction or by an explicit unregister.
    pub fn removed(&self) -> CancellationToken {
        self.removed.clone()
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections dropped because their queue was full or closed.
    pub evicted: usize,
}

/// All currently open connections.
///
/// Sends never wait: a connection whose queue is full is considered too
/// slow and is removed. Removal closes its queue and cancels its
/// `removed` token so the session shuts down.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// connection_id → handle
    conns: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Monotonically increasing counter for connection IDs.
    next_id: AtomicU64,
    /// Per-connection queue capacity.
    capacity: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry whose queues hold `capacity` frames each.
    pub fn new(capacity: usize) -> Self {
        Self {
            conns: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Register a new connection, returning (connection_id, receiver).
    pub async fn register(&self) -> (ConnectionId, ConnectionReceiver) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        let removed = CancellationToken::new();

        self.conns.write().await.insert(
            id,
            ConnectionHandle {
                tx,
                removed: removed.clone(),
            },
        );

        debug!(connection_id = id, "connection registered");
        (id, ConnectionReceiver { rx, removed })
    }

    /// Remove a connection. Returns whether it was still registered.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let Some(handle) = self.conns.write().await.remove(&id) else {
            return false;
        };
        handle.removed.cancel();
        debug!(connection_id = id, "connection unregistered");
        true
    }

    /// Whether `id` is still registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.conns.read().await.contains_key(&id)
    }

    /// Queue a frame for one connection. Returns false if the connection is
    /// unknown or had to be evicted.
    pub async fn send_to(&self, id: ConnectionId, frame: Frame) -> bool {
        let result = {
            let conns = self.conns.read().await;
            match conns.get(&id) {
                Some(handle) => handle.tx.try_send(Arc::new(frame)),
                None => return false,
            }
        };

        match result {
            Ok(()) => true,
            Err(err) => {
                self.evict(&[(id, is_full(&err))]).await;
                false
            }
        }
    }

    /// Queue a frame for every connection except `except`.
    pub async fn broadcast(&self, frame: Frame, except: Option<ConnectionId>) -> Delivery {
        let frame: OutboundFrame = Arc::new(frame);
        let mut delivery = Delivery::default();
        let mut stale: Vec<(ConnectionId, bool)> = Vec::new();

        {
            let conns = self.conns.read().await;
            for (&cid, handle) in conns.iter() {
                if Some(cid) == except {
                    continue;
                }
                match handle.tx.try_send(Arc::clone(&frame)) {
                    Ok(()) => delivery.delivered += 1,
                    Err(err) => stale.push((cid, is_full(&err))),
                }
            }
        } // release read lock before write

        if !stale.is_empty() {
            delivery.evicted = self.evict(&stale).await;
        }
        delivery
    }

    /// Number of open connections.
    pub async fn len(&self) -> usize {
        self.conns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conns.read().await.is_empty()
    }

    async fn evict(&self, stale: &[(ConnectionId, bool)]) -> usize {
        let mut conns = self.conns.write().await;
        let mut evicted = 0;
        for &(cid, overflowed) in stale {
            let Some(handle) = conns.remove(&cid) else {
                continue;
            };
            handle.removed.cancel();
            evicted += 1;
            if overflowed {
                warn!(connection_id = cid, "send queue full, dropping slow connection");
            } else {
                debug!(connection_id = cid, "removed closed connection");
            }
        }
        evicted
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

fn is_full<T>(err: &TrySendError<T>) -> bool {
    matches!(err, TrySendError::Full(_))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
