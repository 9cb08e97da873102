//! One request/response exchange on an accepted connection

use super::{
    AvailableReader, HttpSession, Request, RequestParser, Response, ResponseWriter, Result,
    SessionOps,
};
use std::time::Duration;

/// Default idle gap that ends the initial input drain
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(50);

/// Server side of a single HTTP exchange
///
/// The connection never outlives its response: [`HttpConnection::send_response`]
/// consumes it, and dropping it without answering closes the socket too.
pub struct HttpConnection<S: SessionOps> {
    session: HttpSession<S>,
    parser: RequestParser,
    drain_grace: Duration,
}

impl<S: SessionOps> HttpConnection<S> {
    /// Create a new connection over a session
    pub fn new(session: S) -> Self {
        HttpConnection {
            session: HttpSession::new(session),
            parser: RequestParser::new(),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    /// Set the timeout for reads and writes
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.session.set_timeout(Some(timeout));
    }

    /// Set how long an idle gap must be to end the input drain
    pub fn set_drain_grace(&mut self, grace: Duration) {
        self.drain_grace = grace;
    }

    /// Receive the request
    ///
    /// An empty [`Request`] means the peer sent nothing parseable.
    pub fn receive_request(&mut self) -> Result<Request> {
        let reader = AvailableReader::new(&mut self.session, self.drain_grace);
        self.parser.try_parse(reader)
    }

    /// Write `response` for `request` and close the connection
    pub fn send_response(mut self, response: &Response, request: &Request) -> Result<()> {
        ResponseWriter::new(&mut self.session, request).write(response)?;
        self.session.close()
    }

    /// Close without answering
    pub fn close(mut self) -> Result<()> {
        self.session.close()
    }

    pub fn session(&self) -> &HttpSession<S> {
        &self.session
    }
}
