//! In-flight connections of one server run
//!
//! The accept loop registers every accepted socket for as long as its job
//! runs. Closing the tracker marks the run as stopping and shuts every
//! registered socket down, so a handler blocked in a read returns at once
//! instead of waiting out its read timeout.

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    closed: bool,
    next_id: u64,
    streams: HashMap<u64, TcpStream>,
}

/// Registry of open connections, owned by one run of the accept loop
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    inner: Mutex<Inner>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True once [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of registered connections
    pub fn len(&self) -> usize {
        self.lock().streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Track `stream` until the returned guard is dropped
    ///
    /// After `close` the stream is shut down right away instead.
    pub fn register(self: &Arc<Self>, stream: &TcpStream) -> io::Result<Tracked> {
        let handle = stream.try_clone()?;
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        if inner.closed {
            drop(inner);
            shutdown(&handle);
        } else {
            inner.streams.insert(id, handle);
        }

        Ok(Tracked {
            tracker: Arc::clone(self),
            id,
        })
    }

    /// Mark the run as stopping and shut down every registered socket
    ///
    /// Returns how many sockets were shut down.
    pub fn close(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;
        for stream in inner.streams.values() {
            shutdown(stream);
        }
        inner.streams.len()
    }

    fn deregister(&self, id: u64) {
        self.lock().streams.remove(&id);
    }
}

fn shutdown(stream: &TcpStream) {
    // The peer may already be gone
    if let Err(e) = stream.shutdown(Shutdown::Both) {
        tracing::trace!(error = %e, "connection shutdown failed");
    }
}

/// Registration of one connection; deregisters on drop
#[derive(Debug)]
pub struct Tracked {
    tracker: Arc<ConnectionTracker>,
    id: u64,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.tracker.deregister(self.id);
    }
}
