//! Request dispatch for accepted RPC transports.
//!
//! The job-execution methods live outside this crate and plug in through
//! [`Dispatcher`]. [`PingDispatcher`] is the built-in liveness check.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::credential::Credential;

/// Future returned by a dispatcher for one transport.
pub type DispatchFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

/// Serves every request arriving on one accepted transport.
///
/// Each call runs on its own worker task. The credential is the resolved
/// shared secret the dispatcher authenticates callers against.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, credential: Credential) -> DispatchFuture;
}

/// Line-oriented liveness check.
///
/// `PING <hash>` answers `PONG` when the hash matches the credential and
/// `DENIED` otherwise. Anything else answers `UNSUPPORTED`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingDispatcher;

impl Dispatcher for PingDispatcher {
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, credential: Credential) -> DispatchFuture {
        Box::pin(async move {
            tracing::trace!(peer_addr = %peer, "Serving ping transport");
            serve_ping(stream, &credential).await
        })
    }
}

/// Answer ping lines until the peer closes the stream.
pub async fn serve_ping<S>(stream: S, credential: &Credential) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = respond(&line, credential);
        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

fn respond(line: &str, credential: &Credential) -> &'static str {
    let mut parts = line.trim().splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some("PING"), Some(hash)) if credential.matches(hash) => "PONG",
        (Some("PING"), _) => {
            tracing::warn!("Ping rejected: credential mismatch");
            "DENIED"
        }
        _ => "UNSUPPORTED",
    }
}
