//! HTTP message types
//!
//! This module defines the request side of the model along with the value
//! types shared by requests and responses.

use super::{fields, Content, Error, Header, Result, CRLF};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// HTTP methods the mock server routes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Case-sensitive: `get` is not a method.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP version
///
/// Parsing never fails; anything unrecognised becomes [`Version::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
    Unknown,
}

impl Version {
    /// Parse a version token, with or without the `HTTP/` prefix
    pub fn parse(s: &str) -> Self {
        let number = s.strip_prefix("HTTP/").unwrap_or(s);
        match number {
            "1.0" => Version::Http10,
            "1.1" => Version::Http11,
            _ => Version::Unknown,
        }
    }

    /// The bare version number as it appears after `HTTP/`
    pub fn number(&self) -> &'static str {
        match self {
            Version::Http10 => "1.0",
            Version::Http11 => "1.1",
            Version::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}", self.number())
    }
}

/// HTTP status: a numeric code and its reason phrase
///
/// Two statuses are equal only if both code and reason match, so an ad-hoc
/// `Status::with_reason(404, "Gone Fishing")` is not [`Status::NOT_FOUND`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
    reason: Cow<'static, str>,
}

macro_rules! status_catalog {
    ($($name:ident = $code:literal, $reason:literal;)*) => {
        impl Status {
            $(
                pub const $name: Status = Status {
                    code: $code,
                    reason: Cow::Borrowed($reason),
                };
            )*

            /// Look up the catalogued reason phrase for a code
            pub fn reason_phrase_for(code: u16) -> Option<&'static str> {
                match code {
                    $($code => Some($reason),)*
                    _ => None,
                }
            }
        }
    };
}

status_catalog! {
    CONTINUE = 100, "Continue";
    SWITCHING_PROTOCOLS = 101, "Switching Protocols";
    OK = 200, "OK";
    CREATED = 201, "Created";
    ACCEPTED = 202, "Accepted";
    NON_AUTHORITATIVE_INFORMATION = 203, "Non-Authoritative Information";
    NO_CONTENT = 204, "No Content";
    RESET_CONTENT = 205, "Reset Content";
    PARTIAL_CONTENT = 206, "Partial Content";
    MULTIPLE_CHOICES = 300, "Multiple Choices";
    MOVED_PERMANENTLY = 301, "Moved Permanently";
    FOUND = 302, "Found";
    SEE_OTHER = 303, "See Other";
    NOT_MODIFIED = 304, "Not Modified";
    USE_PROXY = 305, "Use Proxy";
    TEMPORARY_REDIRECT = 307, "Temporary Redirect";
    BAD_REQUEST = 400, "Bad Request";
    UNAUTHORIZED = 401, "Unauthorized";
    PAYMENT_REQUIRED = 402, "Payment Required";
    FORBIDDEN = 403, "Forbidden";
    NOT_FOUND = 404, "Not Found";
    METHOD_NOT_ALLOWED = 405, "Method Not Allowed";
    NOT_ACCEPTABLE = 406, "Not Acceptable";
    PROXY_AUTHENTICATION_REQUIRED = 407, "Proxy Authentication Required";
    REQUEST_TIME_OUT = 408, "Request Time-out";
    CONFLICT = 409, "Conflict";
    GONE = 410, "Gone";
    LENGTH_REQUIRED = 411, "Length Required";
    PRECONDITION_FAILED = 412, "Precondition Failed";
    REQUEST_ENTITY_TOO_LARGE = 413, "Request Entity Too Large";
    REQUEST_URI_TOO_LARGE = 414, "Request-URI Too Large";
    UNSUPPORTED_MEDIA_TYPE = 415, "Unsupported Media Type";
    REQUESTED_RANGE_NOT_SATISFIABLE = 416, "Requested range not satisfiable";
    EXPECTATION_FAILED = 417, "Expectation Failed";
    INTERNAL_SERVER_ERROR = 500, "Internal Server Error";
    NOT_IMPLEMENTED = 501, "Not Implemented";
    BAD_GATEWAY = 502, "Bad Gateway";
    SERVICE_UNAVAILABLE = 503, "Service Unavailable";
    GATEWAY_TIME_OUT = 504, "Gateway Time-out";
    HTTP_VERSION_NOT_SUPPORTED = 505, "HTTP Version not supported";
}

impl Status {
    /// Create a status for any code, using the catalogued reason if there is one
    pub fn new(code: u16) -> Self {
        let reason = Self::reason_phrase_for(code).unwrap_or("");
        Status {
            code,
            reason: Cow::Borrowed(reason),
        }
    }

    /// Create a status with an explicit reason phrase
    pub fn with_reason(code: u16, reason: impl Into<String>) -> Self {
        Status {
            code,
            reason: Cow::Owned(reason.into()),
        }
    }

    /// Get the status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Get the reason phrase
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// HTTP request as received by the mock server
///
/// A request whose method, URI and version are all unset is *empty*: the
/// parser returns one when nothing readable arrived on the connection.
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Option<Method>,
    uri: Option<String>,
    version: Option<Version>,
    host: Option<String>,
    header: Header,
    content: Content,
}

impl Request {
    /// Create a request with method and URI set
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Request {
            method: Some(method),
            uri: Some(uri.into()),
            version: Some(Version::default()),
            ..Request::default()
        }
    }

    /// Create an empty request
    pub fn empty() -> Self {
        Request::default()
    }

    /// True if method, URI and version are all unset
    pub fn is_empty(&self) -> bool {
        self.method.is_none() && self.uri.is_none() && self.version.is_none()
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = Some(method);
    }

    /// The request target exactly as it appeared on the request line
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = Some(uri.into());
    }

    /// The path component of the URI (everything before `?` or `#`)
    pub fn path(&self) -> Option<&str> {
        self.uri
            .as_deref()
            .map(|uri| uri.split(['?', '#']).next().unwrap_or(uri))
    }

    /// The query string without the leading `?`
    pub fn query(&self) -> Option<&str> {
        let uri = self.uri.as_deref()?;
        let (_, rest) = uri.split_once('?')?;
        Some(rest.split('#').next().unwrap_or(rest))
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = Some(version);
    }

    /// The value of the `Host` line, if one was sent
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    /// Convert the request to wire format
    ///
    /// The `Host` line is written first when a host is set and the header
    /// does not already carry one.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        // Request line
        let method = self.method.map(|m| m.as_str()).unwrap_or("GET");
        buf.extend_from_slice(method.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.uri.as_deref().unwrap_or("/").as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.version.unwrap_or_default().to_string().as_bytes());
        buf.extend_from_slice(CRLF.as_bytes());

        if let Some(host) = &self.host {
            if !self.header.contains(fields::HOST) {
                buf.extend_from_slice(format!("{}: {}{}", fields::HOST, host, CRLF).as_bytes());
            }
        }

        buf.extend_from_slice(self.header.to_string().as_bytes());
        for (name, value) in self.content.header_lines() {
            buf.extend_from_slice(format!("{}: {}{}", name, value, CRLF).as_bytes());
        }

        // Empty line
        buf.extend_from_slice(CRLF.as_bytes());

        // Body
        buf.extend_from_slice(self.content.payload());

        buf
    }
}
