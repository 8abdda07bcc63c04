//! Device daemon wire format and the socket seam.
//!
//! The daemon speaks JSON control messages with PascalCase fields; binary
//! payloads travel as raw WebSocket binary frames. Offsets and lengths are
//! lower-case hexadecimal strings without a `0x` prefix.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::{Error, Result};

/// One frame on the daemon socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// A JSON control message for the daemon.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    #[serde(rename = "Opcode")]
    pub opcode: &'static str,
    #[serde(rename = "Space")]
    pub space: &'static str,
    #[serde(rename = "Operands", skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<String>,
}

/// Reply envelope for control messages that answer with JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyEnvelope {
    #[serde(rename = "Results", default)]
    pub results: Vec<serde_json::Value>,
}

/// Format a numeric operand the way the daemon expects.
pub fn hex(value: u32) -> String {
    format!("{value:x}")
}

impl Command {
    pub fn device_list() -> Self {
        Self { opcode: "DeviceList", space: "SNES", operands: Vec::new() }
    }

    pub fn attach(device: &str) -> Self {
        Self { opcode: "Attach", space: "SNES", operands: vec![device.to_string()] }
    }

    pub fn info() -> Self {
        Self { opcode: "Info", space: "SNES", operands: Vec::new() }
    }

    pub fn get_address(offset: u32, length: u32) -> Self {
        Self {
            opcode: "GetAddress",
            space: "SNES",
            operands: vec![hex(offset), hex(length)],
        }
    }

    pub fn put_address(offset: u32, length: u32) -> Self {
        Self {
            opcode: "PutAddress",
            space: "SNES",
            operands: vec![hex(offset), hex(length)],
        }
    }

    /// Priming message for a CPU-assisted write: the payload is a 65816
    /// instruction stream executed from the command space.
    pub fn put_address_cmd(length: u32) -> Self {
        Self {
            opcode: "PutAddress",
            space: "CMD",
            operands: vec![
                "2C00".to_string(),
                hex(length.saturating_sub(1)),
                "2C00".to_string(),
                "1".to_string(),
            ],
        }
    }

    pub fn into_frame(self) -> Result<WireFrame> {
        Ok(WireFrame::Text(serde_json::to_string(&self)?))
    }
}

/// The daemon socket seam. The request queue is the only caller; tests
/// substitute a scripted implementation.
#[async_trait]
pub trait Wire: Send {
    async fn send(&mut self, frame: WireFrame) -> Result<()>;

    /// Receive the next frame. `Err(DeviceUnavailable)` once the socket is
    /// closed or errored.
    async fn recv(&mut self) -> Result<WireFrame>;
}

/// `Wire` over a live WebSocket connection to the daemon.
pub struct WsWire {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsWire {
    pub async fn connect(address: &str) -> Result<Self> {
        debug!("Connecting to device daemon at {}", address);
        let (stream, _) = connect_async(address).await?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl Wire for WsWire {
    async fn send(&mut self, frame: WireFrame) -> Result<()> {
        let message = match frame {
            WireFrame::Text(text) => Message::Text(text),
            WireFrame::Binary(bytes) => Message::Binary(bytes),
        };
        self.stream.send(message).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<WireFrame> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(WireFrame::Text(text)),
                Some(Ok(Message::Binary(bytes))) => return Ok(WireFrame::Binary(bytes)),
                Some(Ok(Message::Close(_))) | None => return Err(Error::DeviceUnavailable),
                // Pings are answered by the library during the next flush.
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    debug!("Device socket error: {}", err);
                    return Err(Error::DeviceUnavailable);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_operands_are_lowercase_unprefixed() {
        assert_eq!(hex(0xF50010), "f50010");
        assert_eq!(hex(0x1), "1");
        assert_eq!(hex(0), "0");
    }

    #[test]
    fn test_get_address_encoding() {
        let command = Command::get_address(0xF50010, 0x15);
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["Opcode"], "GetAddress");
        assert_eq!(json["Space"], "SNES");
        assert_eq!(json["Operands"][0], "f50010");
        assert_eq!(json["Operands"][1], "15");
    }

    #[test]
    fn test_device_list_omits_operands() {
        let json = serde_json::to_value(Command::device_list()).unwrap();
        assert!(json.get("Operands").is_none());
    }

    #[test]
    fn test_cmd_space_priming() {
        let json = serde_json::to_value(Command::put_address_cmd(0x20)).unwrap();
        assert_eq!(json["Space"], "CMD");
        assert_eq!(json["Operands"][0], "2C00");
        assert_eq!(json["Operands"][1], "1f");
        assert_eq!(json["Operands"][3], "1");
    }
}
