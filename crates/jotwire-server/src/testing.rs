//! In-memory [`Link`] for exercising sessions and the registry without sockets.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use bytes::BytesMut;
use jotwire_transport::{ConnectionId, Link, ReadOutcome, Result, SocketOp, TransportError};

pub(crate) enum Script {
    Bytes(Vec<u8>),
    Eof,
}

pub(crate) struct MockLink {
    id: ConnectionId,
    reads: Mutex<VecDeque<Script>>,
    written: Mutex<Vec<Vec<u8>>>,
    fail_writes: bool,
    stall_writes: bool,
    write_started: AtomicBool,
    closed: AtomicBool,
    /// Wakes stalled writers when the link is closed.
    gate: (Mutex<()>, Condvar),
}

impl MockLink {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            reads: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            fail_writes: false,
            stall_writes: false,
            write_started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            gate: (Mutex::new(()), Condvar::new()),
        }
    }

    pub(crate) fn failing(id: ConnectionId) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(id)
        }
    }

    /// Writes block, as on a peer that stopped reading, until the link is closed.
    pub(crate) fn stalled(id: ConnectionId) -> Self {
        Self {
            stall_writes: true,
            ..Self::new(id)
        }
    }

    pub(crate) fn write_started(&self) -> bool {
        self.write_started.load(Ordering::SeqCst)
    }

    pub(crate) fn with_reads(self, reads: Vec<Script>) -> Self {
        *self.reads.lock().unwrap() = reads.into();
        self
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }
}

impl Link for MockLink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    /// Plays the script; once it runs dry the link reports itself closed.
    fn read(&self, dst: &mut BytesMut) -> Result<ReadOutcome> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        match self.reads.lock().unwrap().pop_front() {
            Some(Script::Bytes(bytes)) => {
                dst.extend_from_slice(&bytes);
                Ok(ReadOutcome::Data(bytes.len()))
            }
            Some(Script::Eof) => Ok(ReadOutcome::EndOfStream),
            None => {
                self.closed.store(true, Ordering::SeqCst);
                Err(TransportError::Closed)
            }
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        self.write_started.store(true, Ordering::SeqCst);
        if self.stall_writes {
            let (lock, woken) = &self.gate;
            let guard = lock.lock().unwrap();
            let _guard = woken.wait_while(guard, |_| !self.is_closed()).unwrap();
            return Err(TransportError::Closed);
        }
        if self.fail_writes {
            return Err(TransportError::Os {
                op: SocketOp::Write,
                code: 32,
                message: "Broken pipe".to_string(),
            });
        }
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.written.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn close(&self) -> bool {
        let (lock, woken) = &self.gate;
        let _guard = lock.lock().unwrap();
        let first = !self.closed.swap(true, Ordering::SeqCst);
        woken.notify_all();
        first
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
