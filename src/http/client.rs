//! HTTP client implementation
//!
//! A small blocking client for exercising the mock server over a real
//! socket. It sends one request and reads the response until the server
//! closes the connection or the declared `Content-Length` has arrived.

use super::{
    fields, Error, FdSessionOps, Header, HttpSession, Method, Request, Result, SessionOps,
};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A response as seen on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedResponse {
    pub version: String,
    pub status_code: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ReceivedResponse {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, lossily
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse a complete response head and body
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let head_end = find_head_end(raw)
            .ok_or_else(|| Error::Parse("Response head is not terminated".to_string()))?;
        let head = String::from_utf8_lossy(&raw[..head_end]);
        let mut lines = head.split("\r\n");

        let status_line = lines.next().unwrap_or("");
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().filter(|v| v.starts_with("HTTP/"));
        let code = parts.next().and_then(|c| c.parse::<u16>().ok());
        let (version, status_code) = match (version, code) {
            (Some(version), Some(code)) => (version.to_string(), code),
            _ => return Err(Error::InvalidStatusLine(status_line.to_string())),
        };
        let reason = parts.next().unwrap_or("").to_string();

        let mut headers = Vec::new();
        for line in lines.filter(|l| !l.is_empty()) {
            let (name, value) = Header::parse_header_line(line)?;
            headers.push((name.to_string(), value.to_string()));
        }

        let mut response = ReceivedResponse {
            version,
            status_code,
            reason,
            headers,
            body: Vec::new(),
        };

        let rest = &raw[head_end + 4..];
        response.body = match response.content_length()? {
            Some(length) if rest.len() < length => {
                return Err(Error::IncompleteContent {
                    expected: length,
                    actual: rest.len(),
                })
            }
            Some(length) => rest[..length].to_vec(),
            // The closing blank line is framing, not body
            None => rest.strip_suffix(b"\r\n").unwrap_or(rest).to_vec(),
        };

        Ok(response)
    }

    fn content_length(&self) -> Result<Option<usize>> {
        self.header(fields::CONTENT_LENGTH)
            .map(|value| {
                value
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidContentLength(value.to_string()))
            })
            .transpose()
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// HTTP client
///
/// Provides methods for sending requests and receiving responses.
pub struct HttpClient<S: SessionOps> {
    session: HttpSession<S>,
}

impl HttpClient<FdSessionOps> {
    /// Connect to a server over TCP
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Ok(HttpClient::new(FdSessionOps::new(stream)))
    }
}

impl<S: SessionOps> HttpClient<S> {
    /// Create a new HTTP client with a session
    pub fn new(session: S) -> Self {
        HttpClient {
            session: HttpSession::new(session),
        }
    }

    /// Set the timeout for operations
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.session.set_timeout(Some(timeout));
    }

    /// Send an HTTP request
    pub fn send_request(&mut self, request: &Request) -> Result<()> {
        self.send_raw(&request.to_wire())
    }

    /// Send raw bytes
    pub fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;

        while written < data.len() {
            let n = self.session.write(&data[written..])?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            written += n;
        }

        Ok(())
    }

    /// Receive an HTTP response
    ///
    /// Fails with [`Error::ConnectionClosed`] if the server closed the
    /// connection without sending anything.
    pub fn receive_response(&mut self) -> Result<ReceivedResponse> {
        let mut buffer = Vec::with_capacity(8192);
        let mut temp = [0u8; 4096];

        loop {
            let n = self.session.read(&mut temp)?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&temp[..n]);

            if let Ok(response) = ReceivedResponse::parse(&buffer) {
                if response.content_length()?.is_some() {
                    return Ok(response);
                }
            }
        }

        if buffer.is_empty() {
            return Err(Error::ConnectionClosed);
        }
        ReceivedResponse::parse(&buffer)
    }

    /// Send a simple GET request
    pub fn get(&mut self, uri: &str) -> Result<ReceivedResponse> {
        let mut request = Request::new(Method::Get, uri);
        request.set_host("localhost");

        self.send_request(&request)?;
        self.receive_response()
    }

    /// Send a simple POST request with body
    pub fn post(&mut self, uri: &str, body: impl Into<bytes::Bytes>) -> Result<ReceivedResponse> {
        let mut request = Request::new(Method::Post, uri);
        request.set_host("localhost");
        request.content_mut().set_payload(body);

        self.send_request(&request)?;
        self.receive_response()
    }

    /// Close the connection
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }
}
