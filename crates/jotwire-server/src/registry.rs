use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jotwire_frame::encode;
use jotwire_transport::{Connection, ConnectionId, Link};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

/// Outcome of a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was written to.
    pub delivered: usize,
    /// Connections whose write failed and that were closed and removed.
    pub pruned: Vec<ConnectionId>,
}

/// The set of live connections.
///
/// Membership (register, remove, close_all) is guarded by one lock that is never held
/// across socket I/O, so a peer that stops reading cannot hold up accepting or removing
/// connections. Deliveries (broadcast, send_to) are serialized by a second lock, which
/// keeps frames arriving at each connection in call order.
pub struct ConnectionRegistry<L: Link = Connection> {
    links: Mutex<Vec<Arc<L>>>,
    delivery: Mutex<()>,
}

impl<L: Link> Default for ConnectionRegistry<L> {
    fn default() -> Self {
        Self {
            links: Mutex::new(Vec::new()),
            delivery: Mutex::new(()),
        }
    }
}

impl<L: Link> ConnectionRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<L>>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `link` to the live set. Returns `false` if its id is already live.
    pub fn register(&self, link: Arc<L>) -> bool {
        let mut links = self.lock();
        let id = link.id();
        if links.iter().any(|live| live.id() == id) {
            warn!(id, "connection already registered");
            return false;
        }
        links.push(link);
        debug!(id, live = links.len(), "connection registered");
        true
    }

    /// Close and remove the connection with `id`. Later calls return `None`.
    pub fn remove(&self, id: ConnectionId) -> Option<Arc<L>> {
        let mut links = self.lock();
        let position = links.iter().position(|live| live.id() == id)?;
        links[position].close();
        let removed = links.remove(position);
        debug!(id, live = links.len(), "connection removed");
        Some(removed)
    }

    /// Send `message` to every live connection in registration order.
    ///
    /// A connection whose write fails is closed and removed; the rest still receive
    /// the frame. Only a message that cannot be encoded is an error.
    pub fn broadcast(&self, message: &Value) -> Result<BroadcastReport> {
        let frame = encode(message)?;
        Ok(self.broadcast_frame(&frame))
    }

    /// [`broadcast`](Self::broadcast) for an already encoded frame.
    ///
    /// Connections registered while the frame is being written do not receive it.
    pub fn broadcast_frame(&self, frame: &[u8]) -> BroadcastReport {
        let _delivery = self.lock_delivery();
        let targets: Vec<Arc<L>> = self.lock().clone();

        let mut report = BroadcastReport::default();
        for link in &targets {
            match link.write(frame) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(
                        id = link.id(),
                        error = %err,
                        "dropping connection after failed broadcast"
                    );
                    self.drop_link(link);
                    report.pruned.push(link.id());
                }
            }
        }
        debug!(
            delivered = report.delivered,
            pruned = report.pruned.len(),
            "broadcast"
        );
        report
    }

    /// Send `message` to one connection. Returns whether it was delivered.
    ///
    /// An unknown id is not an error. A failed write removes the connection.
    pub fn send_to(&self, id: ConnectionId, message: &Value) -> Result<bool> {
        let frame = encode(message)?;
        let _delivery = self.lock_delivery();
        let Some(link) = self.lock().iter().find(|live| live.id() == id).cloned() else {
            return Ok(false);
        };
        match link.write(&frame) {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(id, error = %err, "dropping connection after failed send");
                self.drop_link(&link);
                Ok(false)
            }
        }
    }

    /// Close `link` first, so a peer is cut off even if it was already removed.
    fn drop_link(&self, link: &Arc<L>) {
        link.close();
        self.remove(link.id());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().iter().any(|live| live.id() == id)
    }

    /// Ids of the live connections in registration order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.lock().iter().map(|live| live.id()).collect()
    }

    /// Close and remove every connection. Returns how many were live.
    ///
    /// Closing also fails any delivery still blocked writing to one of them.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<L>> = self.lock().drain(..).collect();
        for link in &drained {
            link.close();
        }
        if !drained.is_empty() {
            debug!(closed = drained.len(), "registry cleared");
        }
        drained.len()
    }
}

impl<L: Link> Drop for ConnectionRegistry<L> {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl<L: Link> std::fmt::Debug for ConnectionRegistry<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
