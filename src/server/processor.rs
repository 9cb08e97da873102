//! Request processor contract

use crate::http::{Request, Response};
use std::error::Error as StdError;

/// Failure reported by a [`RequestProcessor`]
///
/// The server drops the connection without a response when it sees one.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProcessorError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        ProcessorError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        ProcessorError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Computes a response from a request
///
/// Invoked synchronously on the thread handling the connection, so it
/// must not block indefinitely. Plain closures `Fn(&Request) -> Response`
/// implement it.
pub trait RequestProcessor: Send + Sync {
    fn process(&self, request: &Request) -> Result<Response, ProcessorError>;
}

impl<F> RequestProcessor for F
where
    F: Fn(&Request) -> Response + Send + Sync,
{
    fn process(&self, request: &Request) -> Result<Response, ProcessorError> {
        Ok(self(request))
    }
}
