//! Response serialization
//!
//! Only the status line and header block are charset-encoded. The body
//! is copied byte for byte so binary payloads survive untouched. Every
//! response ends with a blank line, also when the body is empty.

use super::{fields, Request, Response, Result, CRLF};
use bytes::{BufMut, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use std::fmt::Write as _;
use std::io::Write;

/// Writes one response to an output and releases it
pub struct ResponseWriter<W: Write> {
    out: W,
    encoding: &'static Encoding,
}

impl<W: Write> ResponseWriter<W> {
    /// Create a writer answering `request`
    ///
    /// The header charset is the first `Accept-Charset` value the request
    /// lists. A wildcard, an unknown label or no header at all mean UTF-8.
    pub fn new(out: W, request: &Request) -> Self {
        let encoding = request
            .header()
            .first_value(fields::ACCEPT_CHARSET)
            .filter(|label| *label != "*")
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or(UTF_8);

        ResponseWriter { out, encoding }
    }

    /// The encoding used for the status line and headers
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Serialize `response`, flush, and drop the output
    ///
    /// Consuming the writer is what closes the connection when the output
    /// owns the socket.
    pub fn write(mut self, response: &Response) -> Result<()> {
        let mut head = String::new();
        let _ = write!(head, "{} {}{}", response.version(), response.status_line(), CRLF);
        let _ = write!(head, "{}", response.header());
        for (name, value) in response.content().header_lines() {
            let _ = write!(head, "{}: {}{}", name, value, CRLF);
        }
        head.push_str(CRLF);

        let (head, _, _) = self.encoding.encode(&head);
        let payload = response.content().payload();

        let mut buf = BytesMut::with_capacity(head.len() + payload.len() + CRLF.len());
        buf.put_slice(&head);
        buf.put_slice(payload);
        buf.put_slice(CRLF.as_bytes());

        self.out.write_all(&buf)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Status};

    fn write(request: &Request, response: &Response) -> Vec<u8> {
        let mut out = Vec::new();
        ResponseWriter::new(&mut out, request).write(response).unwrap();
        out
    }

    #[test]
    fn test_write_status_headers_and_body() {
        let request = Request::new(Method::Get, "/test");
        let response = Response::ok()
            .header(fields::DATE, "2011-12-12")
            .content("TestContent")
            .build();

        let out = String::from_utf8(write(&request, &response)).unwrap();
        assert_eq!(
            out,
            "HTTP/1.1 200 OK\r\nDate: 2011-12-12\r\nContent-Length: 11\r\n\r\nTestContent\r\n"
        );
    }

    #[test]
    fn test_write_without_body() {
        let request = Request::new(Method::Get, "/missing");
        let response = Response::status(Status::NOT_FOUND).build();
        assert_eq!(
            write(&request, &response),
            b"HTTP/1.1 404 Not Found\r\n\r\n\r\n"
        );
    }

    #[test]
    fn test_binary_body_unchanged() {
        let mut request = Request::new(Method::Get, "/binary");
        request.header_mut().add(fields::ACCEPT_CHARSET, "ISO-8859-1");
        let response = Response::ok().content(vec![1u8, 2, 3, 4, 5]).build();

        let out = write(&request, &response);
        let body_start = out.len() - 7;
        assert_eq!(&out[body_start..], &[1, 2, 3, 4, 5, b'\r', b'\n']);
    }

    #[test]
    fn test_header_charset_from_accept_charset() {
        let mut request = Request::new(Method::Get, "/latin");
        request.header_mut().add(fields::ACCEPT_CHARSET, "ISO-8859-1");
        request.header_mut().add_weighted(fields::ACCEPT_CHARSET, "utf-8", 0.7);
        let response = Response::ok().header("X-Name", "Cæelo").build();

        let writer = ResponseWriter::new(Vec::new(), &request);
        assert_eq!(writer.encoding().name(), "windows-1252");

        let out = write(&request, &response);
        let needle = [b'C', 0xE6, b'e', b'l', b'o'];
        assert!(out.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn test_unknown_or_wildcard_charset_is_utf8() {
        let mut request = Request::new(Method::Get, "/");
        request.header_mut().add(fields::ACCEPT_CHARSET, "*");
        assert_eq!(ResponseWriter::new(Vec::new(), &request).encoding(), UTF_8);

        let mut request = Request::new(Method::Get, "/");
        request.header_mut().add(fields::ACCEPT_CHARSET, "klingon");
        assert_eq!(ResponseWriter::new(Vec::new(), &request).encoding(), UTF_8);
    }
}
