//! HTTP header handling
//!
//! [`Header`] is an ordered multi-map from field name to a list of
//! [`Parameter`]s. Cookies are kept apart from the other fields and are
//! written back as a single `Cookie` line.

use super::{Error, Result, CRLF};
use std::fmt;

/// Header field names used by the parser, writer and builder
pub mod fields {
    pub const ACCEPT: &str = "Accept";
    pub const ACCEPT_CHARSET: &str = "Accept-Charset";
    pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
    pub const ACCEPT_LANGUAGE: &str = "Accept-Language";
    pub const ACCEPT_RANGES: &str = "Accept-Ranges";
    pub const AGE: &str = "Age";
    pub const CONNECTION: &str = "Connection";
    pub const CONTENT_ENCODING: &str = "Content-Encoding";
    pub const CONTENT_LANGUAGE: &str = "Content-Language";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const CONTENT_LOCATION: &str = "Content-Location";
    pub const CONTENT_MD5: &str = "Content-MD5";
    pub const CONTENT_RANGE: &str = "Content-Range";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const COOKIE: &str = "Cookie";
    pub const DATE: &str = "Date";
    pub const ETAG: &str = "ETag";
    pub const EXPECT: &str = "Expect";
    pub const EXPIRES: &str = "Expires";
    pub const HOST: &str = "Host";
    pub const KEEP_ALIVE: &str = "Keep-Alive";
    pub const LAST_MODIFIED: &str = "Last-Modified";
    pub const LOCATION: &str = "Location";
    pub const PRAGMA: &str = "Pragma";
    pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
    pub const USER_AGENT: &str = "User-Agent";
    pub const WARNING: &str = "Warning";
}

/// A single header value with an optional quality weight
///
/// `quality` is `None` when the token carried no `;q=` suffix. An explicit
/// `q=0` is a different thing and is kept as `Some(0.0)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    value: String,
    quality: Option<f64>,
}

impl Parameter {
    /// Create an unweighted parameter
    pub fn new(value: impl Into<String>) -> Self {
        Parameter {
            value: value.into(),
            quality: None,
        }
    }

    /// Create a weighted parameter
    pub fn weighted(value: impl Into<String>, quality: f64) -> Self {
        Parameter {
            value: value.into(),
            quality: Some(quality),
        }
    }

    /// Parse one comma-separated header token
    ///
    /// `application/xml;q=0.9` becomes a weighted parameter. Tokens without
    /// `;q=` are kept verbatim, other `;` parameters included.
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        match token.find(";q=") {
            Some(idx) => {
                let raw = token[idx + 3..].trim();
                let quality: f64 = raw
                    .parse()
                    .map_err(|_| Error::InvalidQuality(token.to_string()))?;
                if !(0.0..=1.0).contains(&quality) {
                    return Err(Error::InvalidQuality(token.to_string()));
                }
                Ok(Parameter::weighted(token[..idx].trim(), quality))
            }
            None => Ok(Parameter::new(token)),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn quality(&self) -> Option<f64> {
        self.quality
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quality {
            // Debug keeps the fractional part: 1.0 stays "1.0"
            Some(q) => write!(f, "{};q={:?}", self.value, q),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A request cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Cookie {
    name: String,
    value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Parse the value part of a `Cookie` line (`a=1; b=2`)
    ///
    /// A pair without `=` becomes a cookie with an empty value.
    pub fn parse_list(line: &str) -> Vec<Cookie> {
        line.split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((name, value)) => Cookie::new(name.trim(), value.trim()),
                None => Cookie::new(pair, ""),
            })
            .collect()
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Ordered header collection
///
/// Field names are case-sensitive and kept as given. Adding to an existing
/// field appends to its parameter list; fields keep first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    fields: Vec<(String, Vec<Parameter>)>,
    cookies: Vec<Cookie>,
}

impl Header {
    /// Create a new empty header
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unweighted value to a field
    pub fn add(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.add_parameter(field, Parameter::new(value));
    }

    /// Add a weighted value to a field
    pub fn add_weighted(&mut self, field: impl Into<String>, value: impl Into<String>, quality: f64) {
        self.add_parameter(field, Parameter::weighted(value, quality));
    }

    /// Add a parameter to a field
    pub fn add_parameter(&mut self, field: impl Into<String>, parameter: Parameter) {
        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, params)) => params.push(parameter),
            None => self.fields.push((field, vec![parameter])),
        }
    }

    /// Iterate over field names in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// All parameters of a field; empty if the field is absent
    pub fn parameters(&self, field: &str) -> &[Parameter] {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, params)| params.as_slice())
            .unwrap_or(&[])
    }

    /// All values of a field without their weights
    pub fn values(&self, field: &str) -> Vec<&str> {
        self.parameters(field).iter().map(Parameter::value).collect()
    }

    /// The first value of a field
    pub fn first_value(&self, field: &str) -> Option<&str> {
        self.parameters(field).first().map(Parameter::value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }

    /// Number of distinct fields, cookies not counted
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.cookies.is_empty()
    }

    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn set_cookies(&mut self, cookies: Vec<Cookie>) {
        self.cookies = cookies;
    }

    /// Split a header line into trimmed name and value
    pub fn parse_header_line(line: &str) -> Result<(&str, &str)> {
        if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim();
            let value = line[colon_pos + 1..].trim();

            if name.is_empty() {
                return Err(Error::InvalidHeader("Empty header name".to_string()));
            }

            Ok((name, value))
        } else {
            Err(Error::InvalidHeader(format!("No colon in header: {}", line)))
        }
    }
}

/// Wire format: one CRLF-terminated line per field, values comma-joined,
/// then the `Cookie` line if there are cookies.
impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, params) in &self.fields {
            write!(f, "{}: ", name)?;
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", param)?;
            }
            f.write_str(CRLF)?;
        }

        if !self.cookies.is_empty() {
            write!(f, "{}: ", fields::COOKIE)?;
            for (i, cookie) in self.cookies.iter().enumerate() {
                if i > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{}", cookie)?;
            }
            f.write_str(CRLF)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        let mut header = Header::new();
        header.add_parameter("Accept", Parameter::new("text/xml"));
        header.add_parameter("Accept", Parameter::weighted("text/html", 0.1));
        header.add_weighted("Accept-Language", "en", 0.1);
        header.add_weighted("Accept-Language", "en-us", 0.5);
        header.add("Accept-Encoding", "gzip");
        header.add("Accept-Encoding", "deflate");
        header.add("Accept-Charset", "ISO-8859-1");
        header.add_weighted("Accept-Charset", "utf-8", 0.7);
        header.add_weighted("Accept-Charset", "*", 0.7);
        header
    }

    #[test]
    fn test_additions_accumulate_in_order() {
        let header = sample();
        assert_eq!(header.len(), 4);
        assert_eq!(header.values("Accept-Charset"), vec!["ISO-8859-1", "utf-8", "*"]);
        assert_eq!(header.parameters("Accept")[1].quality(), Some(0.1));
        assert_eq!(header.parameters("Accept")[0].quality(), None);
    }

    #[test]
    fn test_field_names_are_case_sensitive() {
        let header = sample();
        assert!(header.contains("Accept"));
        assert!(!header.contains("accept"));
        assert!(header.parameters("accept").is_empty());
        assert_eq!(header.first_value("Missing"), None);
    }

    #[test]
    fn test_display() {
        let expected = "Accept: text/xml,text/html;q=0.1\r\n\
                        Accept-Language: en;q=0.1,en-us;q=0.5\r\n\
                        Accept-Encoding: gzip,deflate\r\n\
                        Accept-Charset: ISO-8859-1,utf-8;q=0.7,*;q=0.7\r\n";
        assert_eq!(sample().to_string(), expected);
    }

    #[test]
    fn test_display_with_cookies() {
        let mut header = sample();
        header.add_cookie(Cookie::new("test", "test"));
        header.add_cookie(Cookie::new("test2", "test2"));
        assert!(header
            .to_string()
            .ends_with("Accept-Charset: ISO-8859-1,utf-8;q=0.7,*;q=0.7\r\nCookie: test=test; test2=test2\r\n"));
    }

    #[test]
    fn test_parameter_parse() {
        assert_eq!(Parameter::parse(" */*;q=0.8").unwrap(), Parameter::weighted("*/*", 0.8));
        assert_eq!(Parameter::parse("gzip").unwrap(), Parameter::new("gzip"));
        assert_eq!(
            Parameter::parse("text/html;level=1").unwrap(),
            Parameter::new("text/html;level=1")
        );
        assert!(matches!(Parameter::parse("en;q=high"), Err(Error::InvalidQuality(_))));
        assert!(matches!(Parameter::parse("en;q=1.5"), Err(Error::InvalidQuality(_))));
    }

    #[test]
    fn test_parameter_display() {
        assert_eq!(Parameter::weighted("en", 1.0).to_string(), "en;q=1.0");
        assert_eq!(Parameter::weighted("en", 0.5).to_string(), "en;q=0.5");
        assert_eq!(Parameter::new("en").to_string(), "en");
    }

    #[test]
    fn test_cookie_parse_list() {
        let cookies = Cookie::parse_list("a=1; b=2");
        assert_eq!(cookies, vec![Cookie::new("a", "1"), Cookie::new("b", "2")]);

        let cookies = Cookie::parse_list("flag; ;token=x=y");
        assert_eq!(cookies, vec![Cookie::new("flag", ""), Cookie::new("token", "x=y")]);
    }

    #[test]
    fn test_parse_header_line() {
        let (name, value) = Header::parse_header_line("Host: localhost:8079").unwrap();
        assert_eq!(name, "Host");
        assert_eq!(value, "localhost:8079");

        let (name, value) = Header::parse_header_line("X-Custom:  value  ").unwrap();
        assert_eq!(name, "X-Custom");
        assert_eq!(value, "value");

        assert!(Header::parse_header_line("Invalid").is_err());
        assert!(Header::parse_header_line(": value").is_err());
    }
}
