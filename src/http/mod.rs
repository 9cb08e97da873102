//! HTTP/1.x wire layer for the mock server
//!
//! This module holds everything between raw socket bytes and the structured
//! request/response model: the data types, the request parser, the response
//! writer and the session abstraction the server and the test client share.
//!
//! # Architecture
//!
//! - `SessionOps` abstracts the transport (poll, read, write, close)
//! - `RequestParser` turns a byte stream into a [`Request`]
//! - `ResponseWriter` turns a [`Response`] back into bytes, picking the
//!   character set from the request's `Accept-Charset`
//! - `HttpConnection` runs one request/response exchange over a session
//!
//! # Examples
//!
//! ```
//! use mockhttp::http::{Method, RequestParser, Version};
//!
//! let raw = b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n";
//! let request = RequestParser::new().parse(&raw[..]);
//!
//! assert_eq!(request.method(), Some(Method::Get));
//! assert_eq!(request.uri(), Some("/hello"));
//! assert_eq!(request.version(), Some(Version::Http11));
//! ```

pub mod client;
pub mod connection;
pub mod content;
pub mod headers;
pub mod message;
pub mod parser;
pub mod response;
pub mod session;
pub mod writer;

pub use client::{HttpClient, ReceivedResponse};
pub use connection::HttpConnection;
pub use content::Content;
pub use headers::{fields, Cookie, Header, Parameter};
pub use message::{Method, Request, Status, Version};
pub use parser::RequestParser;
pub use response::{Response, ResponseBuilder};
pub use session::{AvailableReader, FdSessionOps, HttpSession, SessionOps};
pub use writer::ResponseWriter;

/// Result type for HTTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP operation errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid quality value: {0}")]
    InvalidQuality(String),

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Incomplete content: expected {expected} bytes, got {actual}")]
    IncompleteContent { expected: usize, actual: usize },

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid status line: {0}")]
    InvalidStatusLine(String),

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// Charset used when neither the content nor the request names one
pub const DEFAULT_CHARSET: &str = "utf-8";
