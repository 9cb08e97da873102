//! HTTP request parsing
//!
//! The parser first drains whatever input is available into a buffer, then
//! reads the request line, the header block and a `Content-Length` body from
//! that buffer chained with the rest of the stream. Reading the chained
//! stream byte by byte keeps the header scanner from consuming body bytes.

use super::{fields, Cookie, Error, Method, Parameter, Request, Result, Version};
use std::io::{self, Cursor, Read};
use std::str::FromStr;

/// HTTP request parser
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestParser;

impl RequestParser {
    /// Create a new request parser
    pub fn new() -> Self {
        RequestParser
    }

    /// Parse a request, never failing
    ///
    /// On malformed input the request is returned in whatever state parsing
    /// reached; if nothing readable was found it is [`Request::empty`].
    pub fn parse<R: Read>(&self, input: R) -> Request {
        let mut request = Request::empty();
        if let Err(e) = self.parse_into(input, &mut request) {
            tracing::debug!(error = %e, "returning partially parsed request");
        }
        request
    }

    /// Parse a request, reporting the first error
    pub fn try_parse<R: Read>(&self, input: R) -> Result<Request> {
        let mut request = Request::empty();
        self.parse_into(input, &mut request)?;
        Ok(request)
    }

    fn parse_into<R: Read>(&self, mut input: R, request: &mut Request) -> Result<()> {
        let buffer = drain_available(&mut input)?;
        let mut reader = LineReader::new(Cursor::new(buffer).chain(input));

        let line = match reader.read_line()? {
            Some(line) => line,
            None => return Ok(()),
        };
        tracing::trace!(line = %line, "request line");
        parse_request_line(&line, request)?;
        if request.is_empty() {
            return Ok(());
        }

        while let Some(line) = reader.read_line()? {
            if line.is_empty() {
                break;
            }
            tracing::trace!(line = %line, "header line");
            parse_header_field(&line, request)?;
        }

        if let Some(expected) = request.content().length().filter(|n| *n > 0) {
            let body = reader.read_body(expected)?;
            if body.len() < expected {
                return Err(Error::IncompleteContent {
                    expected,
                    actual: body.len(),
                });
            }
            request.content_mut().set_payload(body);
        }

        Ok(())
    }
}

/// Read until the input reports no more available bytes
fn drain_available<R: Read>(input: &mut R) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => break,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(buffer)
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn map_io(e: io::Error) -> Error {
    if is_timeout(&e) {
        Error::Timeout
    } else {
        Error::Io(e)
    }
}

/// Parse `METHOD URI HTTP/x.y`
///
/// The method is mandatory once a token is present; a missing version
/// token falls back to [`Version::Unknown`].
fn parse_request_line(line: &str, request: &mut Request) -> Result<()> {
    let mut parts = line.split_whitespace();

    let method = match parts.next() {
        Some(token) => Method::from_str(token)?,
        None => return Ok(()),
    };
    request.set_method(method);

    if let Some(uri) = parts.next() {
        request.set_uri(uri);
    }

    let version = parts.next().map(Version::parse).unwrap_or(Version::Unknown);
    request.set_version(version);

    Ok(())
}

/// Route one header line into the request
fn parse_header_field(line: &str, request: &mut Request) -> Result<()> {
    let (name, value) = super::Header::parse_header_line(line)?;

    if name.eq_ignore_ascii_case(fields::HOST) {
        request.set_host(value);
        request.header_mut().add(name, value);
        return Ok(());
    }

    if name.eq_ignore_ascii_case(fields::COOKIE) {
        for cookie in Cookie::parse_list(value) {
            request.header_mut().add_cookie(cookie);
        }
        return Ok(());
    }

    if parse_content_field(name, value, request)? {
        return Ok(());
    }

    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let parameter = Parameter::parse(token)?;
        request.header_mut().add_parameter(name, parameter);
    }

    Ok(())
}

/// Handle the `Content-*` entity fields; `false` if `name` is not one
fn parse_content_field(name: &str, value: &str, request: &mut Request) -> Result<bool> {
    let content = request.content_mut();
    let known = [
        fields::CONTENT_ENCODING,
        fields::CONTENT_LANGUAGE,
        fields::CONTENT_LENGTH,
        fields::CONTENT_LOCATION,
        fields::CONTENT_MD5,
        fields::CONTENT_RANGE,
        fields::CONTENT_TYPE,
    ];
    let field = match known.iter().find(|f| name.eq_ignore_ascii_case(f)) {
        Some(field) => *field,
        None => return Ok(false),
    };

    match field {
        fields::CONTENT_ENCODING => content.set_encoding(value),
        fields::CONTENT_LANGUAGE => content.set_language(value),
        fields::CONTENT_LENGTH => {
            let length = value
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.to_string()))?;
            content.set_length(length);
        }
        fields::CONTENT_LOCATION => content.set_location(value),
        fields::CONTENT_MD5 => content.set_md5(value),
        fields::CONTENT_RANGE => content.set_range(value),
        _ => content.set_mimetype(value),
    }

    Ok(true)
}

/// CR/LF tolerant line scanner
///
/// A line ends at CR, LF or CRLF. After a CR one byte is peeked to absorb a
/// paired LF; anything else is kept as `pending` for the next read. Lines are
/// decoded as UTF-8, with invalid sequences replaced, so no input is rejected.
struct LineReader<R> {
    inner: R,
    pending: Option<u8>,
}

impl<R: Read> LineReader<R> {
    fn new(inner: R) -> Self {
        LineReader {
            inner,
            pending: None,
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        if let Some(byte) = self.pending.take() {
            return Ok(Some(byte));
        }

        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_io(e)),
            }
        }
    }

    /// Next line without its terminator, `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = Vec::new();
        loop {
            match self.next_byte()? {
                None if line.is_empty() => return Ok(None),
                None | Some(b'\n') => return Ok(Some(decode_line(&line))),
                Some(b'\r') => {
                    match self.next_byte()? {
                        Some(b'\n') | None => {}
                        Some(other) => self.pending = Some(other),
                    }
                    return Ok(Some(decode_line(&line)));
                }
                Some(byte) => line.push(byte),
            }
        }
    }

    /// Up to `length` raw bytes; fewer only at end of input.
    ///
    /// `length` comes from the peer, so the buffer grows with what arrives.
    fn read_body(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut chunk = [0u8; 4096];
        let mut body = Vec::with_capacity(length.min(chunk.len()));
        if let Some(byte) = self.pending.take() {
            body.push(byte);
        }

        while body.len() < length {
            let want = (length - body.len()).min(chunk.len());
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => body.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => break,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(body)
    }
}
