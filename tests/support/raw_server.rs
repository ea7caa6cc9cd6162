//! Minimal HTTP/1.1 servers for failure modes wiremock cannot express:
//! a body that stalls mid-transfer, a connection that drops mid-body, and a
//! body that trickles in slowly.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Reads until the end of the request head; false if the client went away.
async fn read_request_head(socket: &mut TcpStream) -> bool {
    let mut request = Vec::new();
    let mut buf = [0_u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    true
}

/// What the server does after sending the first part of the body.
#[derive(Debug, Clone, Copy)]
pub enum AfterPrefix {
    /// Keep the connection open without sending more bytes.
    Stall,
    /// Close the connection before the declared length is reached.
    Drop,
}

/// Serves one connection: declares `declared_len` bytes, sends `prefix`, then stalls or drops.
///
/// Returns the address to request, e.g. `http://{addr}/file`.
pub async fn spawn_partial_body_server(
    declared_len: usize,
    prefix: Vec<u8>,
    after: AfterPrefix,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        if !read_request_head(&mut socket).await {
            return;
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {declared_len}\r\n\r\n"
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(&prefix).await.is_err() {
            return;
        }
        let _ = socket.flush().await;

        match after {
            AfterPrefix::Stall => tokio::time::sleep(Duration::from_secs(30)).await,
            AfterPrefix::Drop => drop(socket),
        }
    });

    addr
}

/// Serves one connection: sends the head at once, then `body` one byte per `interval`.
pub async fn spawn_trickle_body_server(body: Vec<u8>, interval: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        if !read_request_head(&mut socket).await {
            return;
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.flush().await;

        for byte in body {
            tokio::time::sleep(interval).await;
            if socket.write_all(&[byte]).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
        }
    });

    addr
}
