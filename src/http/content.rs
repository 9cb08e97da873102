//! Message payload and its entity metadata

use super::{fields, DEFAULT_CHARSET};
use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};

/// The body of a request or response plus the `Content-*` metadata
///
/// `length` is what goes into `Content-Length`. Setting a payload updates
/// it; the parser sets it first from the header and then reads that many
/// bytes. The payload is an immutable [`Bytes`], so handing it out never
/// exposes server-held state to mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    payload: Bytes,
    length: Option<usize>,
    mimetype: Option<String>,
    charset: String,
    encoding: Option<String>,
    language: Option<String>,
    md5: Option<String>,
    range: Option<String>,
    location: Option<String>,
}

impl Default for Content {
    fn default() -> Self {
        Content {
            payload: Bytes::new(),
            length: None,
            mimetype: None,
            charset: DEFAULT_CHARSET.to_string(),
            encoding: None,
            language: None,
            md5: None,
            range: None,
            location: None,
        }
    }
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    /// The payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// A cheap shared handle to the payload
    pub fn bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Replace the payload; `length` follows the new size
    pub fn set_payload(&mut self, payload: impl Into<Bytes>) {
        self.payload = payload.into();
        self.length = Some(self.payload.len());
    }

    /// Declared length, `None` if never set
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn set_length(&mut self, length: usize) {
        self.length = Some(length);
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    /// Set the mimetype, splitting off a `; charset=` parameter if present
    ///
    /// Without one the charset is reset to UTF-8.
    pub fn set_mimetype(&mut self, mimetype: &str) {
        let mut parts = mimetype.split(';');
        let base = parts.next().unwrap_or("").trim();
        let charset = parts.find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        });

        self.mimetype = Some(base.to_string());
        self.charset = charset.unwrap_or_else(|| DEFAULT_CHARSET.to_string());
    }

    pub fn charset(&self) -> &str {
        &self.charset
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) {
        self.charset = charset.into();
    }

    /// `mimetype; charset=x`, or `None` when no mimetype is set
    pub fn content_type(&self) -> Option<String> {
        self.mimetype
            .as_ref()
            .map(|mimetype| format!("{}; charset={}", mimetype, self.charset))
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.encoding = Some(encoding.into());
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = Some(language.into());
    }

    pub fn md5(&self) -> Option<&str> {
        self.md5.as_deref()
    }

    pub fn set_md5(&mut self, md5: impl Into<String>) {
        self.md5 = Some(md5.into());
    }

    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    pub fn set_range(&mut self, range: impl Into<String>) {
        self.range = Some(range.into());
    }

    /// Absolute location of the entity
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }

    /// Decode the payload with the content charset
    ///
    /// Unknown charsets decode as UTF-8; malformed sequences are replaced.
    pub fn as_string(&self) -> String {
        let encoding = Encoding::for_label(self.charset.as_bytes()).unwrap_or(UTF_8);
        let (text, _, _) = encoding.decode(&self.payload);
        text.into_owned()
    }

    /// The entity header lines in wire order
    ///
    /// Nothing is emitted for an empty payload.
    pub fn header_lines(&self) -> Vec<(&'static str, String)> {
        let length = self.length.unwrap_or(0);
        if length == 0 || self.payload.is_empty() {
            return Vec::new();
        }

        let mut lines = Vec::new();
        if let Some(encoding) = &self.encoding {
            lines.push((fields::CONTENT_ENCODING, encoding.clone()));
        }
        if let Some(content_type) = self.content_type() {
            lines.push((fields::CONTENT_TYPE, content_type));
        }
        lines.push((fields::CONTENT_LENGTH, length.to_string()));
        if let Some(language) = &self.language {
            lines.push((fields::CONTENT_LANGUAGE, language.clone()));
        }
        if let Some(md5) = &self.md5 {
            lines.push((fields::CONTENT_MD5, md5.clone()));
        }
        if let Some(range) = &self.range {
            lines.push((fields::CONTENT_RANGE, range.clone()));
        }
        if let Some(location) = &self.location {
            lines.push((fields::CONTENT_LOCATION, location.clone()));
        }
        lines
    }
}
