use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use jotwire_transport::{Connection, Endpoint, ListeningSocket};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::handler::MessageHandler;
use crate::registry::{BroadcastReport, ConnectionRegistry};
use crate::session::{run_session, SessionConfig, SessionEnd};

/// Port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 2016;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub endpoint: Endpoint,
    /// Pending-connection queue length passed to `listen(2)`.
    pub backlog: i32,
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Listen on the loopback address at `port`.
    pub fn localhost(port: u16) -> Self {
        Self {
            endpoint: Endpoint::localhost(port),
            backlog: libc::SOMAXCONN,
            session: SessionConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::localhost(DEFAULT_PORT)
    }
}

type Workers = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// A listening socket, a registry, and one worker thread per connection.
///
/// Each accepted connection is registered, then served by its own thread until the
/// session ends, at which point it is removed from the registry.
pub struct JsonServer {
    listener: ListeningSocket,
    registry: Arc<ConnectionRegistry>,
    workers: Workers,
}

impl JsonServer {
    /// Bind, listen, and start serving with a fresh registry.
    pub fn start<H>(config: ServerConfig, handler: H) -> Result<Self>
    where
        H: MessageHandler + 'static,
    {
        Self::start_with_registry(config, Arc::new(ConnectionRegistry::new()), handler)
    }

    /// Like [`start`](Self::start), sharing a registry the handler may already hold.
    pub fn start_with_registry<H>(
        config: ServerConfig,
        registry: Arc<ConnectionRegistry>,
        handler: H,
    ) -> Result<Self>
    where
        H: MessageHandler + 'static,
    {
        let mut listener = ListeningSocket::bind(config.endpoint)?;
        let workers: Workers = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<dyn MessageHandler> = Arc::new(handler);

        let accept_registry = Arc::clone(&registry);
        let accept_workers = Arc::clone(&workers);
        let session = config.session;
        listener.listen(config.backlog, move |connection| {
            spawn_session(
                connection,
                session,
                &accept_registry,
                &handler,
                &accept_workers,
            )
        })?;

        info!(endpoint = %listener.local_endpoint(), "server started");
        Ok(Self {
            listener,
            registry,
            workers,
        })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Push `message` to every connected peer.
    pub fn broadcast(&self, message: &Value) -> Result<BroadcastReport> {
        self.registry.broadcast(message)
    }

    pub fn local_endpoint(&self) -> Endpoint {
        self.listener.local_endpoint()
    }

    /// Stop accepting, close every connection, and wait for the workers to exit.
    pub fn shutdown(&mut self) {
        self.listener.shutdown();
        let closed = self.registry.close_all();

        let workers: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for worker in workers {
            if worker.join().is_err() {
                warn!("connection worker panicked");
            }
        }
        if closed > 0 {
            info!(closed, "server stopped");
        }
    }
}

impl Drop for JsonServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for JsonServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonServer")
            .field("listener", &self.listener)
            .field("registry", &self.registry)
            .finish()
    }
}

fn spawn_session(
    connection: Connection,
    session: SessionConfig,
    registry: &Arc<ConnectionRegistry>,
    handler: &Arc<dyn MessageHandler>,
    workers: &Workers,
) {
    let connection = connection.with_read_chunk_size(session.read_chunk_size);
    let id = connection.id();
    let write_timeout = session.write_timeout.filter(|timeout| !timeout.is_zero());
    if let Err(err) = connection.set_write_timeout(write_timeout) {
        warn!(id, error = %err, "failed to configure accepted connection");
        connection.close();
        return;
    }

    // Registration only touches the membership lock, which is never held across I/O.
    let connection = Arc::new(connection);
    if !registry.register(Arc::clone(&connection)) {
        connection.close();
        return;
    }
    info!(id, peer = ?connection.peer_endpoint(), "connection accepted");

    let worker_registry = Arc::clone(registry);
    let handler = Arc::clone(handler);
    let spawned = thread::Builder::new()
        .name(format!("jotwire-conn-{id}"))
        .spawn(move || {
            match run_session(connection.as_ref(), &session, handler.as_ref()) {
                Ok(SessionEnd::PeerClosed) => info!(id, "session ended by peer"),
                Ok(SessionEnd::Closed { reason }) => info!(id, %reason, "session closed"),
                Err(err) => warn!(id, error = %err, "session aborted"),
            }
            worker_registry.remove(id);
        });

    match spawned {
        Ok(worker) => {
            let mut workers = workers.lock().unwrap_or_else(PoisonError::into_inner);
            workers.retain(|worker| !worker.is_finished());
            workers.push(worker);
        }
        Err(err) => {
            warn!(id, error = %err, "failed to spawn connection worker");
            registry.remove(id);
        }
    }
}
