//! The mock HTTP server
//!
//! [`MockHttpServer`] owns a listening socket, a routing table and a default
//! response. `start` spawns the accept loop and returns once the socket is
//! bound and accepting; `stop` shuts down in-flight connections, wakes the
//! loop with a throwaway connection and returns once it has exited and the
//! socket is closed.
//!
//! Every accepted connection carries exactly one exchange:
//!
//! 1. with the timeout flag set, the connection is dropped unanswered
//! 2. the request is parsed; empty or malformed requests are dropped
//! 3. a processor registered for (method, path) computes the response,
//!    else a predefined response is used, else the default response
//! 4. the response is written and the connection closed
//!
//! Failures in one connection are logged and never reach the accept loop.

pub mod config;
pub mod dispatch;
pub mod processor;
pub mod routing;
pub mod signal;
pub mod tracker;

pub use config::ServerConfig;
pub use dispatch::{DispatchMode, Dispatcher, InlineDispatcher, Job, WorkerDispatcher};
pub use processor::{ProcessorError, RequestProcessor};
pub use routing::{normalize_path, Mapping, RoutingTable};
pub use signal::OneShot;
pub use tracker::{ConnectionTracker, Tracked};

use crate::http::{self, FdSessionOps, HttpConnection, Method, Request, Response};
use crate::net;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn, Span};

/// Result type for server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Server lifecycle and connection errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Server did not start within {0:?}")]
    StartTimeout(Duration),

    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Failed to spawn thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),

    #[error("Processor error: {0}")]
    Processor(#[from] ProcessorError),

    #[error("Request processor panicked")]
    ProcessorPanicked,
}

/// Lifecycle state of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl ServerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServerState::Starting,
            2 => ServerState::Running,
            3 => ServerState::Stopping,
            _ => ServerState::Stopped,
        }
    }
}

/// State shared between the server handle, the accept loop and workers
struct Shared {
    routes: RwLock<RoutingTable>,
    default_response: RwLock<Arc<Response>>,
    timeout: AtomicBool,
    state: AtomicU8,
    span: Span,
}

impl Shared {
    fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ServerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn default_response(&self) -> Arc<Response> {
        let guard = self
            .default_response
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Pick the response for a parsed request
    fn resolve(&self, request: &Request) -> Result<Arc<Response>> {
        let (method, path) = match (request.method(), request.path()) {
            (Some(method), Some(path)) => (method, path),
            _ => return Ok(self.default_response()),
        };

        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(processor) = routes.processor(method, path) {
            let processor = Arc::clone(processor);
            drop(routes);
            return invoke(processor.as_ref(), request).map(Arc::new);
        }
        if let Some(response) = routes.response(method, path) {
            return Ok(Arc::clone(response));
        }
        drop(routes);

        Ok(self.default_response())
    }
}

/// Run a processor, treating a panic like a processor error
fn invoke(processor: &dyn RequestProcessor, request: &Request) -> Result<Response> {
    match panic::catch_unwind(AssertUnwindSafe(|| processor.process(request))) {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(Error::Processor(e)),
        Err(_) => Err(Error::ProcessorPanicked),
    }
}

/// Per-connection settings copied into the accept loop at start
#[derive(Debug, Clone, Copy)]
struct ConnectionSettings {
    read_timeout: Duration,
    drain_grace: Duration,
}

/// Everything that exists only while the server runs
///
/// Each `start` gets fresh `connections` and `stopped`, so a loop left over
/// from an earlier run can never be confused with the current one.
struct Lifecycle {
    listener: Arc<TcpListener>,
    local_addr: SocketAddr,
    connections: Arc<ConnectionTracker>,
    stopped: Arc<OneShot<()>>,
    handle: JoinHandle<()>,
}

/// Embeddable mock HTTP server
///
/// # Examples
///
/// ```no_run
/// use mockhttp::http::{HttpClient, Method, Response};
/// use mockhttp::MockHttpServer;
///
/// let server = MockHttpServer::new(0);
/// server.add_response(Method::Get, "/hello", Response::ok().content("Hello").build());
/// server.start().unwrap();
///
/// let addr = server.local_addr().unwrap();
/// let mut client = HttpClient::connect(("127.0.0.1", addr.port())).unwrap();
/// let response = client.get("/hello/").unwrap();
/// assert_eq!(response.body, b"Hello");
///
/// server.stop();
/// ```
pub struct MockHttpServer {
    config: ServerConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Option<Lifecycle>>,
}

impl Default for MockHttpServer {
    fn default() -> Self {
        Self::with_config(ServerConfig::default())
    }
}

fn server_span(port: u16) -> Span {
    tracing::info_span!("mock_http_server", port, addr = tracing::field::Empty)
}

impl MockHttpServer {
    /// Create a server for `port`; `0` picks an ephemeral port at start
    pub fn new(port: u16) -> Self {
        Self::with_config(ServerConfig::default().with_port(port))
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let shared = Shared {
            routes: RwLock::new(RoutingTable::new()),
            default_response: RwLock::new(Arc::new(Response::not_found().build())),
            timeout: AtomicBool::new(false),
            state: AtomicU8::new(ServerState::Stopped as u8),
            span: server_span(config.port),
        };

        MockHttpServer {
            config,
            shared: Arc::new(shared),
            lifecycle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The configured port
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Change the port; takes effect at the next `start`
    pub fn set_port(&mut self, port: u16) {
        self.config.port = port;
    }

    pub fn start_timeout(&self) -> Duration {
        self.config.start_timeout
    }

    pub fn set_start_timeout(&mut self, timeout: Duration) {
        self.config.start_timeout = timeout;
    }

    /// The address actually bound, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_lifecycle().as_ref().map(|l| l.local_addr)
    }

    pub fn state(&self) -> ServerState {
        self.shared.state()
    }

    /// True while the listening socket is open and the loop is accepting
    pub fn is_running(&self) -> bool {
        self.shared.state() == ServerState::Running && self.lock_lifecycle().is_some()
    }

    /// Register a predefined response for (method, path)
    pub fn add_response(&self, method: Method, path: &str, response: Response) {
        self.write_routes().add_response(method, path, response);
    }

    /// Register a processor for (method, path)
    ///
    /// A processor wins over a predefined response for the same key.
    pub fn add_request_processor<P>(&self, method: Method, path: &str, processor: P)
    where
        P: RequestProcessor + 'static,
    {
        self.write_routes()
            .add_processor(method, path, Arc::new(processor));
    }

    /// Drop every registered response and processor
    pub fn clear_routes(&self) {
        self.write_routes().clear();
    }

    /// Replace the response used when nothing matches
    ///
    /// Takes effect for the next request, also while running.
    pub fn set_default_response(&self, response: Response) {
        let mut guard = self
            .shared
            .default_response
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(response);
    }

    pub fn default_response(&self) -> Arc<Response> {
        self.shared.default_response()
    }

    /// While set, connections are dropped without a response
    pub fn set_timeout(&self, timeout: bool) {
        self.shared.timeout.store(timeout, Ordering::SeqCst);
    }

    pub fn is_timeout_set(&self) -> bool {
        self.shared.timeout.load(Ordering::SeqCst)
    }

    fn write_routes(&self) -> std::sync::RwLockWriteGuard<'_, RoutingTable> {
        self.shared
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Option<Lifecycle>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start serving
    ///
    /// Blocks until the accept loop has bound the socket, so a request sent
    /// right after this returns is accepted.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.is_some() {
            return Err(Error::AlreadyRunning);
        }
        self.shared
            .state
            .compare_exchange(
                ServerState::Stopped as u8,
                ServerState::Starting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| Error::AlreadyRunning)?;

        let addr = self.config.bind_addr();
        let listening: Arc<OneShot<io::Result<Arc<TcpListener>>>> = Arc::new(OneShot::new());
        let stopped = Arc::new(OneShot::new());
        let connections = Arc::new(ConnectionTracker::new());
        let settings = ConnectionSettings {
            read_timeout: self.config.read_timeout,
            drain_grace: self.config.drain_grace,
        };

        let handle = {
            let shared = Arc::clone(&self.shared);
            let listening = Arc::clone(&listening);
            let stopped = Arc::clone(&stopped);
            let connections = Arc::clone(&connections);
            let dispatcher = self.config.dispatch.dispatcher();
            thread::Builder::new()
                .name("mock-http-accept".to_string())
                .spawn(move || {
                    let _enter = shared.span.clone().entered();
                    run(addr, &shared, &connections, dispatcher, settings, &listening);
                    stopped.signal(());
                })
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.set_state(ServerState::Stopped);
                return Err(Error::Spawn(e));
            }
        };

        match listening.wait_timeout(self.config.start_timeout) {
            Some(Ok(listener)) => {
                let local_addr = listener.local_addr().unwrap_or(addr);
                self.shared
                    .span
                    .record("addr", tracing::field::display(local_addr));
                self.shared.span.in_scope(|| info!(%local_addr, "listening"));
                self.shared.set_state(ServerState::Running);
                *lifecycle = Some(Lifecycle {
                    listener,
                    local_addr,
                    connections,
                    stopped,
                    handle,
                });
                Ok(())
            }
            Some(Err(source)) => {
                let _ = handle.join();
                self.shared.set_state(ServerState::Stopped);
                Err(Error::Bind { addr, source })
            }
            None => {
                // The loop exits on its own if it binds after all
                connections.close();
                self.shared.set_state(ServerState::Stopped);
                Err(Error::StartTimeout(self.config.start_timeout))
            }
        }
    }

    /// Stop serving; a no-op when not running
    ///
    /// Blocks until the accept loop has exited and the socket is closed.
    pub fn stop(&self) {
        let lifecycle = match self.lock_lifecycle().take() {
            Some(lifecycle) => lifecycle,
            None => return,
        };
        let _enter = self.shared.span.enter();
        let timeout = self.config.stop_timeout;

        self.shared.set_state(ServerState::Stopping);
        let open = lifecycle.connections.close();
        if open > 0 {
            debug!(open, "shut down in-flight connections");
        }

        if let Err(e) = net::unblock_accept(lifecycle.local_addr, timeout) {
            debug!(error = %e, "wake-up connection failed, shutting the listener down");
            shutdown_listener(&lifecycle.listener);
        }

        let mut exited = lifecycle.stopped.wait_timeout(timeout).is_some();
        if !exited {
            warn!(?timeout, "accept loop still running, shutting the listener down");
            shutdown_listener(&lifecycle.listener);
            exited = lifecycle.stopped.wait_timeout(timeout).is_some();
        }

        if exited {
            if lifecycle.handle.join().is_err() {
                warn!("accept loop panicked");
            }
        } else {
            warn!("accept loop did not exit, detaching it");
        }

        drop(lifecycle.listener);
        self.shared.set_state(ServerState::Stopped);
        info!("stopped");
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn shutdown_listener(listener: &TcpListener) {
    if let Err(e) = net::shutdown_listener(listener) {
        debug!(error = %e, "listener shutdown failed");
    }
}

/// Bind, report to `start`, then accept until `connections` is closed
///
/// The loop never touches the server state; only the handle that owns
/// this run's [`Lifecycle`] does.
fn run(
    addr: SocketAddr,
    shared: &Arc<Shared>,
    connections: &Arc<ConnectionTracker>,
    mut dispatcher: Box<dyn Dispatcher>,
    settings: ConnectionSettings,
    listening: &OneShot<io::Result<Arc<TcpListener>>>,
) {
    let listener = match net::bind_listener(addr) {
        Ok(listener) => Arc::new(listener),
        Err(e) => {
            warn!(%addr, error = %e, "bind failed");
            listening.signal(Err(e));
            return;
        }
    };

    if !listening.signal(Ok(Arc::clone(&listener))) || connections.is_closed() {
        return;
    }

    for incoming in listener.incoming() {
        if connections.is_closed() {
            break;
        }

        let stream = match incoming {
            Ok(stream) => stream,
            Err(e) if connections.is_closed() => {
                debug!(error = %e, "accept interrupted by stop");
                break;
            }
            Err(e) if e.raw_os_error() == Some(libc::EINVAL) => {
                warn!(error = %e, "listener shut down, leaving accept loop");
                break;
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        let peer = stream.peer_addr().ok();
        let tracked = match connections.register(&stream) {
            Ok(tracked) => Some(tracked),
            Err(e) => {
                debug!(?peer, error = %e, "connection not tracked");
                None
            }
        };
        let shared = Arc::clone(shared);
        let job: Job = Box::new(move || {
            let _tracked = tracked;
            let _enter = shared.span.enter();
            let session = FdSessionOps::new(stream);
            if let Err(e) = handle_connection(session, &shared, settings) {
                warn!(?peer, error = %e, "connection dropped");
            }
        });
        if let Err(e) = dispatcher.dispatch(job) {
            warn!(?peer, error = %e, "failed to dispatch connection");
        }
    }

    dispatcher.shutdown();
}

/// Serve one exchange on an accepted connection
fn handle_connection(
    session: FdSessionOps,
    shared: &Shared,
    settings: ConnectionSettings,
) -> Result<()> {
    if shared.timeout.load(Ordering::SeqCst) {
        debug!("timeout flag set, dropping connection unanswered");
        return Ok(());
    }

    let mut connection = HttpConnection::new(session);
    connection.set_timeout(settings.read_timeout);
    connection.set_drain_grace(settings.drain_grace);

    let request = connection.receive_request()?;
    if request.is_empty() {
        warn!("empty request, dropping connection");
        return Ok(());
    }
    trace!(uri = ?request.uri(), "request received");

    let response = shared.resolve(&request)?;
    debug!(
        method = ?request.method(),
        path = ?request.path(),
        status = response.status_line().code(),
        "dispatching response"
    );

    connection.send_response(&response, &request)?;
    Ok(())
}
