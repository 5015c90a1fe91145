//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;

use agentd::AgentConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Config for an agent rooted at `home` with ephemeral loopback ports.
pub fn test_config(home: &Path) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.home = home.to_path_buf();
    config.rpc.bind_host = "127.0.0.1".to_string();
    config.rpc.port = 0;
    config.control.port = 0;
    config.control.poll_interval_ms = 10;
    config
}

/// Start a mock registry that answers every request with `status` and
/// forwards each request body to the returned receiver.
#[allow(dead_code)]
pub async fn start_mock_registry(status: u16) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let body = read_http_body(&mut socket).await;
                let _ = tx.send(body);

                let status_text = match status {
                    200 => "200 OK",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_text
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Read one HTTP/1.1 request and return its body.
async fn read_http_body(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = find_header_end(&buf) {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + length {
                return String::from_utf8_lossy(&buf[end..end + length]).into_owned();
            }
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::new(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}
