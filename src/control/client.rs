//! Client side of the shutdown protocol, used by `agentd stop`.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::{AgentConfig, ShutdownMode};
use crate::error::AgentError;

/// Control socket address of the agent described by `config`.
///
/// The stop command always targets loopback.
pub fn control_address(config: &AgentConfig) -> Result<SocketAddr, AgentError> {
    match config.shutdown_mode() {
        ShutdownMode::Listen(port) if port != 0 => Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port))),
        _ => Err(AgentError::ControlDisabled(config.control.port)),
    }
}

/// Connect, write the token, flush and close. No reply is expected.
pub async fn send_shutdown(address: SocketAddr, token: &str) -> Result<(), AgentError> {
    let connect_err = |source| AgentError::ControlConnect { address, source };

    let mut stream = TcpStream::connect(address).await.map_err(connect_err)?;
    stream.write_all(token.as_bytes()).await.map_err(connect_err)?;
    stream.flush().await.map_err(connect_err)?;
    stream.shutdown().await.map_err(connect_err)?;

    tracing::info!(address = %address, "Shutdown command sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn reserved_ports_cannot_be_stopped_remotely() {
        let mut config = AgentConfig::default();
        config.control.port = -1;
        assert!(matches!(control_address(&config), Err(AgentError::ControlDisabled(-1))));

        config.control.port = 2600;
        assert_eq!(
            control_address(&config).unwrap(),
            "127.0.0.1:2600".parse::<SocketAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn writes_exactly_the_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).await.unwrap();
            received
        });

        send_shutdown(addr, "stop").await.unwrap();
        assert_eq!(reader.await.unwrap(), b"stop");
    }

    #[tokio::test]
    async fn unreachable_agent_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = send_shutdown(addr, "stop").await.unwrap_err();
        assert!(matches!(err, AgentError::ControlConnect { .. }));
    }
}
