//! # aplink-core
//!
//! Core library for the aplink multiworld bridge.
//!
//! This crate provides:
//! - The single-flight request queue and device session over the QUsb2Snes
//!   daemon socket
//! - Static ROM location tables and the per-session location index
//! - The reconciliation engine that diffs live game memory against known
//!   state and batches deltas for the server
//! - The multiworld server protocol and connection/session state machines
//! - Cached state reused across restarts (data package, client id)
//!
//! Everything runs on a single-threaded cooperative runtime: device access
//! is serialized through the request queue, and the reconciliation tick is
//! strictly single-flight.

pub mod config;
pub mod consts;
pub mod error;
pub mod protocol;
pub mod rom;
pub mod server;
pub mod session;
pub mod snes;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{
    ClientMessage, ClientStatus, Connected, DataPackageData, NetworkItem, NetworkPlayer,
    ProtocolVersion, RoomInfo, ServerMessage, decode_frame, encode_frame,
};
pub use rom::{Category, Coordinate, Location, LocationTable};
pub use server::{ReconnectPolicy, ServerLink, normalize_address};
pub use session::{ConsoleCommand, Session, SessionEnd};
pub use snes::{DeviceSession, QueueHandle, SnesMemory, WriteMode, WsWire, discover};
pub use storage::CacheStore;
pub use sync::{SyncEngine, TickOutcome, TickReport};
