//! Connection endpoints, timing constants, and protocol version data.

/// QUsb2Snes / SNI device daemon endpoint and timing.
pub mod device {
    use std::time::Duration;

    /// Default daemon WebSocket endpoint.
    pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:8080";

    /// Minimum interval between commands issued to the daemon. The daemon
    /// processes one command at a time and misbehaves when flooded.
    pub const COMMAND_INTERVAL: Duration = Duration::from_millis(25);

    /// How long to wait for a reply before declaring the device lost. An
    /// unanswered request leaves unknown state on the device, so this is
    /// fatal to the session rather than retried.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Poll interval for device discovery while no device is attached.
    pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(5);

    /// Delay before rediscovery after a device fault.
    pub const REDISCOVERY_DELAY: Duration = Duration::from_secs(5);
}

/// Archipelago server connection parameters.
pub mod server {
    use std::time::Duration;

    /// Port assumed when the user supplies a bare hostname.
    pub const DEFAULT_PORT: u16 = 38281;

    /// Delay between reconnection attempts after an unexpected close.
    pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

    /// Reconnection attempts before giving up and surfacing the failure.
    pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
}

/// Reconciliation loop timing.
pub mod sync {
    use std::time::Duration;

    /// Cadence of the reconciliation tick. Item delivery is bounded to one
    /// item per tick, so this also caps the delivery rate.
    pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
}

/// Multiworld protocol version advertised during authentication.
pub mod version {
    pub const MAJOR: i32 = 0;
    pub const MINOR: i32 = 0;
    pub const BUILD: i32 = 3;
}

/// Game identity sent in the `Connect` handshake.
pub const GAME_NAME: &str = "A Link to the Past";

/// Client tags sent in the `Connect` handshake.
pub const CLIENT_TAGS: &[&str] = &["LttP Client"];
