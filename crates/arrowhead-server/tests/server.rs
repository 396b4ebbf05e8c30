//! HTTP/1.1 round trips over a real socket.

use std::time::Duration;

use arrowhead_core::{HasBody, HttpService, ServiceRequest, ServiceResponse};
use arrowhead_future::Future;
use arrowhead_server::{EngineConfig, HttpEngine, Server, ShutdownSignal};
use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn exchange(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8(raw).unwrap()
}

#[tokio::test]
async fn test_round_trip_and_shutdown() {
    let engine = HttpEngine::new(
        EngineConfig::builder()
            .shutdown_timeout(Duration::from_secs(1))
            .build(),
    );
    engine
        .provide(
            HttpService::builder("echo")
                .base_path("/echo")
                .post("/", |request: ServiceRequest, response: ServiceResponse| {
                    request.body().text().map(move |text| {
                        response
                            .with_status(StatusCode::OK)
                            .with_body(text.to_uppercase())
                    })
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(engine);
    let engine = server.engine().clone();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(server.serve(listener, shutdown.clone()));

    let reply = exchange(
        addr,
        "POST /echo HTTP/1.1\r\nHost: test\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    )
    .await;
    assert!(reply.starts_with("HTTP/1.1 200 OK"), "{reply}");
    assert!(reply.ends_with("HELLO"), "{reply}");

    let reply = exchange(
        addr,
        "GET /elsewhere HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(reply.starts_with("HTTP/1.1 404 Not Found"), "{reply}");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(engine.services().is_empty());
}

#[tokio::test]
async fn test_truncated_body_after_response_closes_connection() {
    let engine = HttpEngine::new(EngineConfig::default());
    engine
        .provide(
            HttpService::builder("sink")
                .base_path("/sink")
                .post("/", |_: ServiceRequest, response: ServiceResponse| {
                    Future::success(response.with_status(StatusCode::ACCEPTED))
                })
                .build()
                .unwrap(),
        )
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(Server::new(engine).serve(listener, shutdown.clone()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /sink HTTP/1.1\r\nHost: test\r\nContent-Length: 100\r\n\r\npartial")
        .await
        .unwrap();
    stream.shutdown().await.unwrap();

    // A reset is as good as an orderly close here.
    let mut raw = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .expect("connection should be closed");
    if read.is_ok() {
        let reply = String::from_utf8_lossy(&raw);
        assert!(reply.is_empty() || reply.starts_with("HTTP/1.1 202 Accepted"), "{reply}");
    }

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
