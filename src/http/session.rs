//! Session operations abstraction
//!
//! The server, the connection handler and the test client all talk to the
//! socket through [`SessionOps`], so the request/response code never touches
//! a raw `TcpStream` and can be driven over any transport in tests.

use super::{Error, Result};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::Duration;

/// Session operations trait
///
/// This trait defines the operations that can be performed on a session.
pub trait SessionOps {
    /// Poll the session for events
    ///
    /// Returns true if the session is ready for the requested operation
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> Result<bool>;

    /// Read data from the session
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write data to the session
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Close the session; calling it again is a no-op
    fn close(&mut self) -> Result<()>;
}

/// Poll events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvents {
    Read,
    Write,
    Both,
}

/// Default timeout for session reads and writes
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP session wrapping a transport with session operations
///
/// Dropping the session closes it.
pub struct HttpSession<S: SessionOps> {
    session: S,
    timeout: Option<Duration>,
}

impl<S: SessionOps> HttpSession<S> {
    /// Create a new HTTP session
    pub fn new(session: S) -> Self {
        HttpSession {
            session,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the timeout for operations
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Get the timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Read data with timeout
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_within(buf, self.timeout)
    }

    /// Read data, waiting at most `timeout` for it to arrive
    pub fn read_within(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        if !self.session.poll(PollEvents::Read, timeout)? {
            return Err(Error::Timeout);
        }

        self.session.read(buf)
    }

    /// Write data with timeout
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.session.poll(PollEvents::Write, self.timeout)? {
            return Err(Error::Timeout);
        }

        self.session.write(buf)
    }

    /// Close the session
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    /// Get a reference to the underlying session
    pub fn get_ref(&self) -> &S {
        &self.session
    }

    /// Get a mutable reference to the underlying session
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: SessionOps> Drop for HttpSession<S> {
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            tracing::trace!(error = %e, "session close failed");
        }
    }
}

fn to_io_error(e: Error) -> io::Error {
    match e {
        Error::Io(e) => e,
        Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, "session timed out"),
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

impl<S: SessionOps> Read for HttpSession<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        HttpSession::read(self, buf).map_err(to_io_error)
    }
}

impl<S: SessionOps> Write for HttpSession<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        HttpSession::write(self, buf).map_err(to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainPhase {
    First,
    Draining,
    Live,
}

/// Reader exposing "what is available now" semantics over a session
///
/// The first read waits up to the session timeout. After that each read
/// waits only `grace`; when nothing arrives within it the reader reports
/// `Ok(0)` once, ending the drain, and later reads wait the full session
/// timeout again. The parser uses the `Ok(0)` to stop draining and the
/// full-timeout reads to finish a body that arrived late.
pub struct AvailableReader<'a, S: SessionOps> {
    session: &'a mut HttpSession<S>,
    grace: Duration,
    phase: DrainPhase,
}

impl<'a, S: SessionOps> AvailableReader<'a, S> {
    pub fn new(session: &'a mut HttpSession<S>, grace: Duration) -> Self {
        AvailableReader {
            session,
            grace,
            phase: DrainPhase::First,
        }
    }
}

impl<S: SessionOps> Read for AvailableReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.phase {
            DrainPhase::First => {
                let n = self.session.read(buf).map_err(to_io_error)?;
                self.phase = DrainPhase::Draining;
                Ok(n)
            }
            DrainPhase::Draining => match self.session.read_within(buf, Some(self.grace)) {
                Ok(n) => Ok(n),
                Err(Error::Timeout) => {
                    self.phase = DrainPhase::Live;
                    Ok(0)
                }
                Err(e) => Err(to_io_error(e)),
            },
            DrainPhase::Live => self.session.read(buf).map_err(to_io_error),
        }
    }
}

/// Plain file descriptor session operations
pub struct FdSessionOps {
    stream: TcpStream,
    closed: bool,
}

impl FdSessionOps {
    /// Create a new FD session operations from a TCP stream
    pub fn new(stream: TcpStream) -> Self {
        FdSessionOps {
            stream,
            closed: false,
        }
    }

    /// Get a reference to the underlying stream
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Get a mutable reference to the underlying stream
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

/// How long `close` keeps discarding unread input after shutting down writes
const CLOSE_DRAIN: Duration = Duration::from_millis(20);

impl SessionOps for FdSessionOps {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> Result<bool> {
        use libc::{poll, pollfd, POLLIN, POLLOUT};

        let mut pfd = pollfd {
            fd: self.stream.as_raw_fd(),
            events: match events {
                PollEvents::Read => POLLIN,
                PollEvents::Write => POLLOUT,
                PollEvents::Both => POLLIN | POLLOUT,
            },
            revents: 0,
        };

        let timeout_ms = timeout
            .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
            .unwrap_or(-1); // -1 = infinite

        let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(Error::Io(err));
        }

        Ok(result > 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf).map_err(Error::from)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.stream.write(buf).map_err(Error::from)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Unread request bytes would make the kernel answer with RST and
        // the peer could lose the response, so discard them first.
        self.stream.shutdown(Shutdown::Write).map_err(Error::from)?;
        let mut scratch = [0u8; 512];
        while self.poll(PollEvents::Read, Some(CLOSE_DRAIN))? {
            match self.stream.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        Ok(())
    }
}

/// Helper to create an HTTP session from a TCP stream
pub fn from_tcp_stream(stream: TcpStream) -> HttpSession<FdSessionOps> {
    HttpSession::new(FdSessionOps::new(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_fd_session_ops() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"Hello").unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut session = FdSessionOps::new(stream);

        // Poll for read
        assert!(session.poll(PollEvents::Read, Some(Duration::from_secs(1))).unwrap());

        // Read data
        let mut buf = [0u8; 5];
        let n = SessionOps::read(&mut session, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"Hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_http_session_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        // Don't send anything - test timeout
        let _handle = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(2));
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut session = from_tcp_stream(stream);
        session.set_timeout(Some(Duration::from_millis(100)));

        let mut buf = [0u8; 10];
        let result = session.read(&mut buf);
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).unwrap();
            buf
        });

        let mut session = from_tcp_stream(TcpStream::connect(addr).unwrap());
        session.write(b"bye").unwrap();
        session.close().unwrap();
        session.close().unwrap();
        drop(session);

        assert_eq!(handle.join().unwrap(), b"bye");
    }

    #[test]
    fn test_available_reader_ends_drain_after_grace() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"first").unwrap();
            thread::sleep(Duration::from_millis(300));
            stream.write_all(b"late").unwrap();
            thread::sleep(Duration::from_millis(200));
        });

        let mut session = from_tcp_stream(TcpStream::connect(addr).unwrap());
        session.set_timeout(Some(Duration::from_secs(2)));
        let mut reader = AvailableReader::new(&mut session, Duration::from_millis(50));

        let mut drained = Vec::new();
        reader.read_to_end(&mut drained).unwrap();
        assert_eq!(drained, b"first");

        // After the drain ends, reads wait the full timeout again
        let mut late = [0u8; 4];
        reader.read_exact(&mut late).unwrap();
        assert_eq!(&late, b"late");

        handle.join().unwrap();
    }

    #[test]
    fn test_available_reader_first_read_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let _handle = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(500));
        });

        let mut session = from_tcp_stream(TcpStream::connect(addr).unwrap());
        session.set_timeout(Some(Duration::from_millis(100)));
        let mut reader = AvailableReader::new(&mut session, Duration::from_millis(20));

        let mut buf = [0u8; 8];
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
