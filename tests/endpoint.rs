//! End-to-end behavior of the endpoint over real loopback sockets.

use std::time::Duration;

use hello_endpoint::endpoint::StartError;
use hello_endpoint::http::{build_response, HTML_BODY};
use hello_endpoint::net::ResolveError;
use hello_endpoint::{Endpoint, EndpointError, Shutdown};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

mod common;

#[tokio::test]
async fn binds_requested_numeric_port() {
    let port = free_port_string();
    let endpoint = Endpoint::with_address(Some("127.0.0.1"), &port).await;

    assert!(endpoint.is_ready());
    let info = endpoint.info().unwrap();
    assert_eq!(info.host, "127.0.0.1");
    assert_eq!(info.service, port);
}

#[tokio::test]
async fn every_request_gets_the_same_response() {
    let running = common::start_endpoint(common::loopback_config("0")).await;
    let expected = build_response().into_bytes();

    let requests: [&[u8]; 4] = [
        b"",
        b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n",
        b"POST /submit HTTP/1.0\r\nContent-Length: 3\r\n\r\nabc",
        &[0xff, 0x00, 0xfe, 0x10],
    ];
    for request in requests {
        assert_eq!(common::exchange(running.addr, request).await, expected);
    }

    let text = String::from_utf8(expected).unwrap();
    assert!(text.contains(&format!("Content-Length: {}\n", HTML_BODY.len())));
    assert!(text.ends_with(HTML_BODY));

    let summary = running.stop().await;
    assert_eq!(summary.connections_served, 4);
    assert_eq!(summary.responses_sent, 4);
    assert_eq!(summary.responses_failed, 0);
    assert_eq!(summary.accept_failures, 0);
}

#[tokio::test]
async fn connections_are_served_one_after_another() {
    let running = common::start_endpoint(common::loopback_config("0")).await;

    // First client connects and stalls, holding the only serve slot.
    let mut first = TcpStream::connect(running.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Second client is queued in the backlog with its request already sent.
    let mut second = TcpStream::connect(running.addr).await.unwrap();
    second.write_all(b"GET /second HTTP/1.1\r\n\r\n").await.unwrap();

    let mut probe = [0u8; 1];
    let waiting = tokio::time::timeout(Duration::from_millis(300), second.peek(&mut probe)).await;
    assert!(waiting.is_err(), "second client answered while first was open");

    first.write_all(b"GET /first HTTP/1.1\r\n\r\n").await.unwrap();
    let first_response = common::read_response(&mut first).await;
    assert_eq!(first_response, build_response().as_bytes());

    let second_response = common::read_response(&mut second).await;
    assert_eq!(second_response, build_response().as_bytes());

    let summary = running.stop().await;
    assert_eq!(summary.connections_served, 2);
    assert_eq!(summary.responses_sent, 2);
}

#[tokio::test]
async fn restart_rebinds_same_port() {
    let port = free_port_string();

    let running = common::start_endpoint(common::loopback_config(&port)).await;
    // The server closes first, leaving its side of the connection in
    // TIME_WAIT on the listening port.
    let response = common::exchange_server_closes(running.addr, b"ping").await;
    assert_eq!(response, build_response().as_bytes());
    let summary = running.stop().await;
    assert_eq!(summary.connections_served, 1);

    let restarted = Endpoint::with_address(Some("127.0.0.1"), &port).await;
    assert!(restarted.is_ready(), "rebind failed: {:?}", restarted.failure());
    assert_eq!(restarted.info().unwrap().service, port);
}

#[tokio::test]
async fn unresolvable_host_never_listens() {
    let mut endpoint = Endpoint::with_address(Some("no-such-host.invalid"), "8080").await;
    assert!(!endpoint.is_ready());
    assert!(matches!(
        endpoint.failure(),
        Some(StartError::Resolve(ResolveError::Lookup { .. }))
    ));

    let shutdown = Shutdown::new();
    let result = endpoint.run(shutdown.subscribe()).await;
    assert!(matches!(result, Err(EndpointError::NotReady)));
}

#[tokio::test]
async fn invalid_service_never_listens() {
    let endpoint = Endpoint::with_address(None, "no-such-service").await;
    assert!(!endpoint.is_ready());
    assert!(matches!(
        endpoint.failure(),
        Some(StartError::Resolve(ResolveError::Service(_)))
    ));
}

#[tokio::test]
async fn oversized_request_does_not_stop_the_server() {
    let running = common::start_endpoint(common::loopback_config("0")).await;

    let mut big = TcpStream::connect(running.addr).await.unwrap();
    big.write_all(&vec![b'x'; 5000]).await.unwrap();
    // The server closes with unread bytes pending, which may reset the
    // connection before the response is read. Either outcome is fine.
    let mut sink = Vec::new();
    let _ = tokio::time::timeout(
        common::IO_TIMEOUT,
        tokio::io::AsyncReadExt::read_to_end(&mut big, &mut sink),
    )
    .await;

    let response = common::exchange(running.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(response, build_response().as_bytes());

    assert_eq!(running.stop().await.connections_served, 2);
}

#[tokio::test]
async fn shutdown_interrupts_a_stalled_client() {
    let running = common::start_endpoint(common::loopback_config("0")).await;

    let _stalled = TcpStream::connect(running.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let summary = running.stop().await;
    assert_eq!(summary.connections_served, 0);
}

fn free_port_string() -> String {
    common::free_port().to_string()
}
