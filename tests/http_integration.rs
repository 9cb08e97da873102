//! Integration tests for the HTTP layer
//!
//! These tests run one exchange between HttpClient and HttpConnection over
//! real loopback sockets, without the server lifecycle around them.

mod common;

use mockhttp::http::session::FdSessionOps;
use mockhttp::http::{fields, HttpClient, HttpConnection, Method, Request, Response, Status};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

#[test]
fn test_http_request_response_cycle() {
    common::init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Server thread
    let server_handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut connection = HttpConnection::new(FdSessionOps::new(stream));

        let request = connection.receive_request().unwrap();
        assert_eq!(request.method(), Some(Method::Get));
        assert_eq!(request.uri(), Some("/test"));
        assert_eq!(request.host(), Some("localhost"));

        let response = Response::ok()
            .content_type("text/plain")
            .content("Hello World")
            .build();
        connection.send_response(&response, &request).unwrap();
    });

    let stream = TcpStream::connect(addr).unwrap();
    let mut client = HttpClient::new(FdSessionOps::new(stream));

    let mut request = Request::new(Method::Get, "/test");
    request.set_host("localhost");
    client.send_request(&request).unwrap();

    let response = client.receive_response().unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.reason, "OK");
    assert_eq!(response.header(fields::CONTENT_TYPE), Some("text/plain; charset=utf-8"));
    assert_eq!(response.header(fields::CONTENT_LENGTH), Some("11"));
    assert_eq!(response.body, b"Hello World");

    server_handle.join().unwrap();
}

#[test]
fn test_http_post_with_body() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server_handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut connection = HttpConnection::new(FdSessionOps::new(stream));

        let request = connection.receive_request().unwrap();
        assert_eq!(request.method(), Some(Method::Post));
        assert_eq!(request.uri(), Some("/data"));
        assert_eq!(request.content().payload(), b"test data");

        let response = Response::ok().content("Received").build();
        connection.send_response(&response, &request).unwrap();
    });

    let mut client = HttpClient::connect(addr).unwrap();
    let response = client.post("/data", "test data").unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, b"Received");

    server_handle.join().unwrap();
}

#[test]
fn test_http_large_body() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let test_body = "Hello World".repeat(1000);
    let expected_body = test_body.clone();

    let server_handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut connection = HttpConnection::new(FdSessionOps::new(stream));

        let request = connection.receive_request().unwrap();
        assert_eq!(request.content().length(), Some(test_body.len()));
        assert_eq!(request.content().payload(), test_body.as_bytes());

        let response = Response::ok().content(test_body).build();
        connection.send_response(&response, &request).unwrap();
    });

    let mut client = HttpClient::connect(addr).unwrap();
    let response = client.post("/upload", expected_body.clone()).unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, expected_body.as_bytes());

    server_handle.join().unwrap();
}

#[test]
fn test_body_sent_after_headers() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server_handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut connection = HttpConnection::new(FdSessionOps::new(stream));
        connection.set_drain_grace(Duration::from_millis(20));

        let request = connection.receive_request().unwrap();
        assert_eq!(request.content().payload(), b"late body");

        let response = Response::status(Status::CREATED).build();
        connection.send_response(&response, &request).unwrap();
    });

    let mut client = HttpClient::connect(addr).unwrap();
    client
        .send_raw(b"PUT /slow HTTP/1.1\r\nHost: localhost\r\nContent-Length: 9\r\n\r\n")
        .unwrap();
    thread::sleep(Duration::from_millis(200));
    client.send_raw(b"late body").unwrap();

    let response = client.receive_response().unwrap();
    assert_eq!(response.status_code, 201);
    assert_eq!(response.reason, "Created");

    server_handle.join().unwrap();
}

#[test]
fn test_connection_closed_without_response() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server_handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut connection = HttpConnection::new(FdSessionOps::new(stream));
        let _request = connection.receive_request().unwrap();
        connection.close().unwrap();
    });

    let mut client = HttpClient::connect(addr).unwrap();
    client.set_timeout(Duration::from_secs(2));
    let result = client.get("/ignored");
    assert!(result.is_err());

    server_handle.join().unwrap();
}

#[test]
fn test_http_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Server that never answers
    let _server_handle = thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(2));
    });

    let mut client = HttpClient::connect(addr).unwrap();
    client.set_timeout(Duration::from_millis(100));

    let result = client.get("/");
    assert!(matches!(result, Err(mockhttp::http::Error::Timeout)));
}
