use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("SNES device unavailable")]
    DeviceUnavailable,

    #[error("SNES device did not answer within {0:?}")]
    DeviceTimeout(std::time::Duration),

    #[error("SNES device protocol error: {0}")]
    Device(String),

    #[error("Server connection closed")]
    ServerClosed,

    #[error("Server refused the connection: {}", .0.join(", "))]
    ConnectionRefused(Vec<String>),

    #[error("Malformed server command: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check whether this error means the device session is gone for good
    /// and a fresh discovery cycle is required.
    pub fn is_device_fault(&self) -> bool {
        matches!(
            self,
            Error::DeviceUnavailable | Error::DeviceTimeout(_) | Error::Device(_)
        )
    }
}
