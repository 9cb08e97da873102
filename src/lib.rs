//! mockhttp - an embeddable mock HTTP server for tests
//!
//! The server listens on a real TCP port, parses HTTP/1.x requests itself
//! and answers from a table of predefined responses or through request
//! processors, so test suites can assert against a wire-level exchange.
//!
//! One request is served per connection. There is no keep-alive, TLS,
//! HTTP/2 or chunked transfer encoding.
//!
//! # Examples
//!
//! ```no_run
//! use mockhttp::http::{Method, Request, Response, Status};
//! use mockhttp::MockHttpServer;
//!
//! let server = MockHttpServer::new(8080);
//! server.add_response(Method::Get, "/status", Response::ok().content("up").build());
//! server.add_request_processor(Method::Post, "/login", |request: &Request| {
//!     if request.content().payload() == b"secret" {
//!         Response::ok().build()
//!     } else {
//!         Response::status(Status::UNAUTHORIZED).build()
//!     }
//! });
//!
//! server.start()?;
//! // ... exercise the code under test against http://localhost:8080 ...
//! server.stop();
//! # Ok::<(), mockhttp::server::Error>(())
//! ```

pub mod http;
pub mod net;
pub mod server;

pub use server::{DispatchMode, MockHttpServer, RequestProcessor, ServerConfig, ServerState};
