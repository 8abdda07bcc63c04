//! Multiworld server connection plumbing.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::consts::server;
use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ServerMessage, decode_frame, encode_frame};

/// Turn user input into a dialable WebSocket URL, assuming the default
/// port when none is given.
pub fn normalize_address(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .strip_prefix("ws://")
        .or_else(|| trimmed.strip_prefix("wss://"))
        .unwrap_or(trimmed);

    let has_port = without_scheme
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()));

    if has_port {
        format!("ws://{without_scheme}")
    } else {
        format!("ws://{}:{}", without_scheme, server::DEFAULT_PORT)
    }
}

/// One open connection to the multiworld server.
pub struct ServerLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ServerLink {
    pub async fn connect(address: &str) -> Result<Self> {
        debug!("Connecting to server at {}", address);
        let (stream, _) = connect_async(address).await?;
        Ok(Self { stream })
    }

    /// Send a batch of commands as one frame.
    pub async fn send(&mut self, messages: &[ClientMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let frame = encode_frame(messages)?;
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|_| Error::ServerClosed)
    }

    /// Receive the next frame's commands, each decoded independently.
    /// `Err(ServerClosed)` once the socket is gone.
    pub async fn recv(&mut self) -> Result<Vec<Result<ServerMessage>>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return decode_frame(&text),
                Some(Ok(Message::Close(_))) | None => return Err(Error::ServerClosed),
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    debug!("Server socket error: {}", err);
                    return Err(Error::ServerClosed);
                }
            }
        }
    }
}

/// Bounded fixed-backoff reconnection policy.
///
/// An authentication refusal is terminal: credentials or versions will not
/// heal on their own. Losing the device is terminal too, since
/// authentication requires a device read.
#[derive(Debug, Default)]
pub struct ReconnectPolicy {
    attempts: u32,
    refused: bool,
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The server explicitly refused authentication.
    pub fn note_refused(&mut self) {
        self.refused = true;
    }

    /// A connection reached the authenticated state; the attempt count
    /// starts over.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Ask permission for another attempt after an unexpected close.
    /// `None` means give up and surface the failure.
    pub fn next_attempt(&mut self, device_attached: bool) -> Option<std::time::Duration> {
        if self.refused || !device_attached {
            return None;
        }
        self.attempts += 1;
        if self.attempts > server::MAX_RECONNECT_ATTEMPTS {
            None
        } else {
            Some(server::RECONNECT_DELAY)
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
