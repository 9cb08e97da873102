//! Response model and its builder
//!
//! A [`Response`] can only be obtained from a [`ResponseBuilder`]; once built
//! it exposes getters only, so a response registered with the server stays
//! exactly as it was built no matter how many connections send it.

use super::{fields, Content, Error, Header, Result, Status, Version};
use bytes::Bytes;
use encoding_rs::Encoding;
use serde::Serialize;
use std::time::SystemTime;

/// HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    version: Version,
    status: Status,
    header: Header,
    content: Content,
}

impl Response {
    /// Start building a response with the given status
    pub fn status(status: Status) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Start building a `200 OK` response
    pub fn ok() -> ResponseBuilder {
        Self::status(Status::OK)
    }

    /// Start building a `404 Not Found` response
    pub fn not_found() -> ResponseBuilder {
        Self::status(Status::NOT_FOUND)
    }

    /// Get the HTTP version (defaults to 1.1)
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status_line(&self) -> &Status {
        &self.status
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn content(&self) -> &Content {
        &self.content
    }
}

/// Builder for HTTP responses
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    version: Version,
    status: Status,
    header: Header,
    content: Content,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        ResponseBuilder::new(Status::OK)
    }
}

impl ResponseBuilder {
    pub fn new(status: Status) -> Self {
        ResponseBuilder {
            version: Version::default(),
            status,
            header: Header::new(),
            content: Content::new(),
        }
    }

    /// Set the status
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set the status from a bare code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status = Status::new(code);
        self
    }

    /// Set the HTTP version
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Set the payload; `Content-Length` follows its size
    pub fn content(mut self, content: impl Into<Bytes>) -> Self {
        self.content.set_payload(content);
        self
    }

    /// Set a text payload encoded in the named charset
    ///
    /// Characters the charset cannot represent are replaced the way
    /// `encoding_rs` does it (numeric character references).
    pub fn text(mut self, text: &str, charset: &str) -> Result<Self> {
        let encoding = Encoding::for_label(charset.as_bytes())
            .ok_or_else(|| Error::UnsupportedCharset(charset.to_string()))?;
        let (bytes, _, _) = encoding.encode(text);
        self.content.set_payload(bytes.into_owned());
        self.content.set_charset(charset);
        Ok(self)
    }

    /// Set the payload to the JSON serialization of `value`
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        self.content.set_payload(bytes);
        Ok(self)
    }

    /// Add a header field value
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.add(name, value);
        self
    }

    /// Set the language of the response
    pub fn language(mut self, language: &str) -> Self {
        self.header.add(fields::ACCEPT_LANGUAGE, language);
        self.content.set_language(language);
        self
    }

    /// Set the `Expires` header
    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.header.add(fields::EXPIRES, httpdate::fmt_http_date(expires));
        self
    }

    /// Set the `Last-Modified` header
    pub fn last_modified(mut self, last_modified: SystemTime) -> Self {
        self.header
            .add(fields::LAST_MODIFIED, httpdate::fmt_http_date(last_modified));
        self
    }

    /// Set the absolute location of the content
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.content.set_location(location);
        self
    }

    /// Set the mimetype, e.g. `text/plain; charset=iso-8859-1`
    ///
    /// Also adds the type as an `Accept` hint.
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.header.add(fields::ACCEPT, content_type);
        self.content.set_mimetype(content_type);
        self
    }

    /// Build the response
    pub fn build(self) -> Response {
        Response {
            version: self.version,
            status: self.status,
            header: self.header,
            content: self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_ok() {
        let response = Response::ok().build();
        assert_eq!(response.status_line(), &Status::OK);
        assert_eq!(response.version(), Version::Http11);
    }

    #[test]
    fn test_status() {
        let response = Response::status(Status::NOT_FOUND).build();
        assert_eq!(response.status_line(), &Status::NOT_FOUND);

        let response = Response::ok().status_code(418).build();
        assert_eq!(response.status_line().code(), 418);
    }

    #[test]
    fn test_content_sets_length() {
        let response = Response::ok()
            .header(fields::DATE, "2011-12-12")
            .content("TestContent")
            .build();
        assert_eq!(response.content().length(), Some(11));
        assert_eq!(response.content().payload(), b"TestContent");
        assert_eq!(response.header().values(fields::DATE), vec!["2011-12-12"]);
    }

    #[test]
    fn test_content_replaced_recomputes_length() {
        let response = Response::ok().content("long content").content("abc").build();
        assert_eq!(response.content().length(), Some(3));
    }

    #[test]
    fn test_language() {
        let response = Response::ok().language("en").build();
        assert_eq!(response.header().values(fields::ACCEPT_LANGUAGE), vec!["en"]);
        assert_eq!(response.content().language(), Some("en"));
    }

    #[test]
    fn test_content_type_splits_charset() {
        let response = Response::ok()
            .content_type("text/plain; charset=iso-8859-1")
            .build();
        assert_eq!(response.content().mimetype(), Some("text/plain"));
        assert_eq!(response.content().charset(), "iso-8859-1");
        assert_eq!(
            response.header().first_value(fields::ACCEPT),
            Some("text/plain; charset=iso-8859-1")
        );

        let response = Response::ok().content_type("text/html").build();
        assert_eq!(response.content().charset(), "utf-8");
    }

    #[test]
    fn test_dates_are_http_dates() {
        let date = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let response = Response::ok().expires(date).last_modified(date).build();
        assert_eq!(
            response.header().first_value(fields::EXPIRES),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
        assert_eq!(
            response.header().first_value(fields::LAST_MODIFIED),
            Some("Sun, 06 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn test_text_in_charset() {
        let response = Response::ok().text("Cæelo", "iso-8859-1").unwrap().build();
        assert_eq!(response.content().payload(), &[0x43, 0xE6, 0x65, 0x6C, 0x6F]);
        assert_eq!(response.content().as_string(), "Cæelo");

        assert!(matches!(
            Response::ok().text("x", "no-such-charset"),
            Err(Error::UnsupportedCharset(_))
        ));
    }

    #[test]
    fn test_json() {
        let response = Response::ok().json(&vec![1, 2, 3]).unwrap().build();
        assert_eq!(response.content().payload(), b"[1,2,3]");
    }

    #[test]
    fn test_location() {
        let response = Response::status(Status::CREATED)
            .location("http://localhost/items/1")
            .build();
        assert_eq!(response.content().location(), Some("http://localhost/items/1"));
    }
}
