//! End-to-end tests over a real loopback socket.

use std::net::SocketAddr;
use std::time::Duration;

use falcon_core::App;
use falcon_server::{Server, ServerConfig, ShutdownSignal};
use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    task: JoinHandle<Result<(), falcon_server::ServerError>>,
}

async fn start() -> Running {
    start_with(ServerConfig::builder().shutdown_timeout(Duration::from_millis(500)).build()).await
}

async fn start_with(config: ServerConfig) -> Running {
    let mut app = App::new();
    app.use_middleware(|ctx| {
        ctx.set_header("x-served-by", "falcon");
    });
    app.get("/hello/:name", |ctx| {
        let name = ctx.param("name").unwrap_or_default().to_string();
        ctx.write_str(&format!("hello {name}"));
    })
    .unwrap();
    app.get("/boom", |_ctx| panic!("handler exploded"))
        .unwrap();
    app.post("/form", |ctx| {
        let name = ctx.get("name").unwrap_or("?").to_string();
        ctx.write_str(&name);
    })
    .unwrap();
    app.get("/whoami", |ctx| {
        let body = format!("{} {}", ctx.scheme(), ctx.ip());
        ctx.write_str(&body);
    })
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(config, app.build().unwrap());

    let shutdown = ShutdownSignal::new();
    let task = tokio::spawn(server.serve_listener(listener, shutdown.clone()));

    Running {
        addr,
        shutdown,
        task,
    }
}

/// Sends one request with `Connection: close` and returns status, head and body.
async fn send(addr: SocketAddr, request: &str) -> (StatusCode, String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap();
    (status, head.to_ascii_lowercase(), body.to_string())
}

fn get(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
}

#[tokio::test]
async fn serves_matched_route() {
    let server = start().await;

    let (status, head, body) = send(server.addr, &get("/hello/ada")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(head.contains("x-served-by: falcon"));
    assert_eq!(body, "hello ada");

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn unknown_path_returns_json_404() {
    let server = start().await;

    let (status, head, body) = send(server.addr, &get("/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(head.contains("content-type: application/json"));
    assert!(body.contains("NOT_FOUND"));

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn wrong_method_returns_405_with_allow() {
    let server = start().await;

    let request = "DELETE /hello/ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n";
    let (status, head, _) = send(server.addr, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(head.contains("allow: get"));

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn panicking_handler_does_not_take_down_server() {
    let server = start().await;

    let (status, _, body) = send(server.addr, &get("/boom")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("exploded"));

    let (status, _, body) = send(server.addr, &get("/hello/again")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "hello again");

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn form_body_reaches_data_bag() {
    let server = start().await;

    let payload = "name=grace";
    let request = format!(
        "POST /form HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{payload}",
        payload.len()
    );
    let (status, _, body) = send(server.addr, &request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "grace");

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

fn post_form(payload: &str) -> String {
    format!(
        "POST /form HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{payload}",
        payload.len()
    )
}

#[tokio::test]
async fn oversized_body_returns_413() {
    let server = start_with(
        ServerConfig::builder()
            .shutdown_timeout(Duration::from_millis(500))
            .max_body_size(16)
            .build(),
    )
    .await;

    let (status, _, body) = send(server.addr, &post_form("name=grace")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "grace");

    let (status, head, body) = send(server.addr, &post_form(&format!("name={}", "x".repeat(64)))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(head.contains("content-type: application/json"));
    assert!(body.contains("PAYLOAD_TOO_LARGE"));

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_chunked_body_returns_413() {
    let server = start_with(
        ServerConfig::builder()
            .shutdown_timeout(Duration::from_millis(500))
            .max_body_size(16)
            .build(),
    )
    .await;

    let chunk = format!("name={}", "x".repeat(27));
    let request = format!(
        "POST /form HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\nTransfer-Encoding: chunked\r\n\r\n\
         {:x}\r\n{chunk}\r\n0\r\n\r\n",
        chunk.len()
    );
    let (status, _, body) = send(server.addr, &request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body.contains("PAYLOAD_TOO_LARGE"));

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn context_sees_peer_address() {
    let server = start().await;

    let (_, _, body) = send(server.addr, &get("/whoami")).await;
    assert_eq!(body, "http 127.0.0.1");

    let request = "GET /whoami HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
                   X-Forwarded-Proto: https\r\nX-Forwarded-For: 203.0.113.9, 10.0.0.1\r\n\r\n";
    let (_, _, body) = send(server.addr, request).await;
    assert_eq!(body, "https 203.0.113.9");

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn keep_alive_serves_several_requests() {
    let server = start().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let pipelined = format!(
        "GET /hello/one HTTP/1.1\r\nHost: localhost\r\n\r\n{}",
        get("/hello/two")
    );
    stream.write_all(pipelined.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();
    let raw = String::from_utf8(raw).unwrap();
    assert!(raw.contains("hello one"));
    assert!(raw.contains("hello two"));

    server.shutdown.trigger();
    server.task.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let server = start().await;
    server.shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let refused = TcpStream::connect(server.addr).await;
    assert!(refused.is_err());
}
