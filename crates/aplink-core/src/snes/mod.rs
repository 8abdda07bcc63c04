mod device;
pub mod queue;
pub mod wire;

pub use device::{DeviceSession, SnesMemory, WriteMode, discover};
pub use queue::{Expect, QueueHandle, Reply};
pub use wire::{Command, Wire, WireFrame, WsWire};
