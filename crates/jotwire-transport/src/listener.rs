use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::endpoint::Endpoint;
use crate::error::{Result, SocketOp, TransportError};

/// How long the acceptor waits for readiness before re-checking for shutdown.
const POLL_INTERVAL_MS: libc::c_int = 100;

/// A bound IPv4 TCP socket that hands accepted connections to a callback.
///
/// Accepting happens on a dedicated acceptor thread that waits for the descriptor to
/// become readable and accepts exactly one pending connection per notification. The
/// callback must not block; it is expected to dispatch session work elsewhere.
pub struct ListeningSocket {
    listener: Arc<TcpListener>,
    endpoint: Endpoint,
    running: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
}

impl ListeningSocket {
    /// Create a socket with address reuse enabled and bind it to `endpoint`.
    pub fn bind(endpoint: Endpoint) -> Result<Self> {
        // SAFETY: plain socket(2) call with constant arguments.
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, libc::IPPROTO_TCP) };
        if fd == -1 {
            return Err(TransportError::last_os_error(SocketOp::Create));
        }
        // SAFETY: `fd` was just returned by socket(2) and is owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        set_reuse_address(fd.as_raw_fd())?;
        bind_ipv4(fd.as_raw_fd(), endpoint)?;

        let listener = TcpListener::from(fd);
        let endpoint = listener
            .local_addr()
            .ok()
            .and_then(Endpoint::from_socket_addr)
            .unwrap_or(endpoint);

        debug!(%endpoint, "socket bound");

        Ok(Self {
            listener: Arc::new(listener),
            endpoint,
            running: Arc::new(AtomicBool::new(false)),
            acceptor: None,
        })
    }

    /// Start listening and accept connections on a background thread.
    ///
    /// Accept failures are logged and never stop the acceptor.
    pub fn listen<F>(&mut self, backlog: i32, on_accept: F) -> Result<()>
    where
        F: FnMut(Connection) + Send + 'static,
    {
        if self.acceptor.is_some() {
            return Err(TransportError::Os {
                op: SocketOp::Listen,
                code: libc::EINVAL,
                message: "socket is already listening".to_string(),
            });
        }

        // SAFETY: the descriptor is owned by `self.listener` and open.
        let rc = unsafe { libc::listen(self.listener.as_raw_fd(), backlog) };
        if rc != 0 {
            return Err(TransportError::last_os_error(SocketOp::Listen));
        }
        // Readiness is driven by poll(2); a spurious wakeup must not block in accept.
        self.listener
            .set_nonblocking(true)
            .map_err(|e| TransportError::os(SocketOp::Configure, e))?;

        self.running.store(true, Ordering::SeqCst);
        let listener = Arc::clone(&self.listener);
        let running = Arc::clone(&self.running);
        let acceptor = std::thread::Builder::new()
            .name(format!("jotwire-accept-{}", self.endpoint.port()))
            .spawn(move || accept_loop(&*listener, &running, on_accept))
            .map_err(|e| TransportError::os(SocketOp::Listen, e))?;
        self.acceptor = Some(acceptor);

        info!(endpoint = %self.endpoint, backlog, "listening");
        Ok(())
    }

    /// The bound endpoint. A requested port of 0 resolves to the assigned port.
    pub fn local_endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn is_listening(&self) -> bool {
        self.acceptor.is_some() && self.running.load(Ordering::SeqCst)
    }

    /// Stop accepting and wait for the acceptor thread to exit.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(acceptor) = self.acceptor.take() {
            if acceptor.join().is_err() {
                warn!(endpoint = %self.endpoint, "acceptor thread panicked");
            }
            debug!(endpoint = %self.endpoint, "acceptor stopped");
        }
    }
}

impl Drop for ListeningSocket {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ListeningSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListeningSocket")
            .field("endpoint", &self.endpoint)
            .field("listening", &self.is_listening())
            .finish()
    }
}

/// The two calls the acceptor thread makes against a listening socket.
trait AcceptSource {
    /// Wait up to `timeout_ms` for a pending connection.
    fn wait_readable(&self, timeout_ms: libc::c_int) -> Result<bool>;

    fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

impl AcceptSource for TcpListener {
    fn wait_readable(&self, timeout_ms: libc::c_int) -> Result<bool> {
        poll_readable(self.as_raw_fd(), timeout_ms)
    }

    fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self)
    }
}

fn accept_loop<S, F>(source: &S, running: &AtomicBool, mut on_accept: F)
where
    S: AcceptSource + ?Sized,
    F: FnMut(Connection),
{
    while running.load(Ordering::SeqCst) {
        match source.wait_readable(POLL_INTERVAL_MS) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                warn!(error = %err, "readiness wait failed");
                continue;
            }
        }

        match source.accept() {
            Ok((stream, addr)) => {
                // Accepted sockets inherit O_NONBLOCK on some platforms.
                if let Err(err) = stream.set_nonblocking(false) {
                    warn!(%addr, error = %err, "failed to configure accepted socket");
                    continue;
                }
                let connection = Connection::from_stream(stream);
                debug!(id = connection.id(), %addr, "accepted connection");
                on_accept(connection);
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
            Err(err) => {
                let err = TransportError::os(SocketOp::Accept, err);
                warn!(error = %err, "accept failed");
            }
        }
    }
}

/// Wait until `fd` is readable. Returns `Ok(false)` on timeout or interruption.
fn poll_readable(fd: RawFd, timeout_ms: libc::c_int) -> Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: `pfd` is a valid pollfd and we pass a count of exactly one.
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(TransportError::os(SocketOp::Poll, err));
    }
    Ok(rc > 0 && pfd.revents & libc::POLLIN != 0)
}

fn set_reuse_address(fd: RawFd) -> Result<()> {
    let enable: libc::c_int = 1;
    // SAFETY: `enable` outlives the call and the length matches its type.
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            (&enable as *const libc::c_int).cast::<libc::c_void>(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(TransportError::last_os_error(SocketOp::Configure));
    }
    Ok(())
}

fn bind_ipv4(fd: RawFd, endpoint: Endpoint) -> Result<()> {
    // SAFETY: sockaddr_in is plain old data; all-zero is a valid starting value.
    let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    addr.sin_family = libc::AF_INET as libc::sa_family_t;
    addr.sin_port = endpoint.port().to_be();
    addr.sin_addr = libc::in_addr {
        s_addr: u32::from(endpoint.addr()).to_be(),
    };

    // SAFETY: `addr` is a fully initialized sockaddr_in and the length matches it.
    let rc = unsafe {
        libc::bind(
            fd,
            (&addr as *const libc::sockaddr_in).cast::<libc::sockaddr>(),
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(TransportError::last_os_error(SocketOp::Bind));
    }
    Ok(())
}
