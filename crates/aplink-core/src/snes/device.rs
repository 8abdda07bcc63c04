//! Device discovery, attachment, and addressed memory access.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::rom::layout::WRAM_START;
use crate::snes::queue::{Expect, QueueHandle, Reply};
use crate::snes::wire::{Command, WireFrame};

/// How the attached device accepts writes, resolved once at attach time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The device writes bytes straight into the requested address.
    Direct,
    /// Hardware (sd2snes/fxpak) that cannot write console RAM directly; the
    /// payload is compiled into an instruction stream the console executes.
    CpuAssisted,
}

impl WriteMode {
    /// Classify from the device identity string.
    pub fn classify(device: &str) -> Self {
        let lower = device.to_lowercase();
        if lower.contains("sd2snes") || lower.contains("fxpak") || device.contains("COM") {
            WriteMode::CpuAssisted
        } else {
            WriteMode::Direct
        }
    }
}

/// Byte-addressed access to the attached device's memory.
///
/// The reconciliation engine depends on this seam rather than on a live
/// socket, so its tick protocol is testable against plain byte arrays.
#[async_trait]
pub trait SnesMemory: Send + Sync {
    async fn read(&self, offset: u32, length: u32) -> Result<Vec<u8>>;
    async fn write(&self, offset: u32, data: &[u8]) -> Result<()>;
}

/// An attached device. All traffic goes through the request queue; dropping
/// the session leaves the queue free for the next attach.
pub struct DeviceSession {
    queue: QueueHandle,
    device: String,
    mode: WriteMode,
}

/// List devices the daemon currently knows about. Polled while empty;
/// hot-plugging is the norm.
pub async fn discover(queue: &QueueHandle) -> Result<Vec<String>> {
    let reply = queue
        .submit(vec![Command::device_list().into_frame()?], Expect::Json)
        .await?;
    let Reply::Results(results) = reply else {
        return Err(Error::Device("DeviceList reply missing results".into()));
    };
    Ok(results
        .into_iter()
        .filter_map(|value| value.as_str().map(str::to_string))
        .collect())
}

impl DeviceSession {
    /// Attach to a device and classify its write mode.
    ///
    /// `Attach` itself is not answered; the following `Info` round-trip
    /// confirms the attach took effect.
    pub async fn attach(queue: QueueHandle, device: &str) -> Result<Self> {
        queue
            .submit(vec![Command::attach(device).into_frame()?], Expect::None)
            .await?;
        let reply = queue
            .submit(vec![Command::info().into_frame()?], Expect::Json)
            .await?;

        let Reply::Results(results) = reply else {
            return Err(Error::Device("Info reply missing results".into()));
        };
        if let Some(firmware) = results.first().and_then(|v| v.as_str()) {
            debug!("Device firmware: {}", firmware);
        }

        let mode = WriteMode::classify(device);
        info!("Attached to {} ({:?} writes)", device, mode);

        Ok(Self { queue, device: device.to_string(), mode })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }
}

#[async_trait]
impl SnesMemory for DeviceSession {
    async fn read(&self, offset: u32, length: u32) -> Result<Vec<u8>> {
        let reply = self
            .queue
            .submit(
                vec![Command::get_address(offset, length).into_frame()?],
                Expect::Bytes(length as usize),
            )
            .await?;
        match reply {
            Reply::Bytes(bytes) => Ok(bytes),
            _ => Err(Error::Device("GetAddress reply was not binary".into())),
        }
    }

    async fn write(&self, offset: u32, data: &[u8]) -> Result<()> {
        let frames = match self.mode {
            WriteMode::Direct => vec![
                Command::put_address(offset, data.len() as u32).into_frame()?,
                WireFrame::Binary(data.to_vec()),
            ],
            WriteMode::CpuAssisted => {
                let stream = compile_store_stream(offset, data);
                vec![
                    Command::put_address_cmd(stream.len() as u32).into_frame()?,
                    WireFrame::Binary(stream),
                ]
            }
        };
        // Priming message and payload are one request, so nothing can
        // interleave between them.
        self.queue.submit(frames, Expect::None).await?;
        Ok(())
    }
}

/// Compile a write into the 65816 store sequence executed by the console.
///
/// Preserves CPU state, stores each byte with `LDA #imm` / `STA.l addr`
/// against the console-visible WRAM address, then restores state and jumps
/// back through the NMI vector.
fn compile_store_stream(offset: u32, data: &[u8]) -> Vec<u8> {
    const PROLOGUE: &[u8] = &[0x00, 0xE2, 0x20, 0x48, 0xEB, 0x48];
    const EPILOGUE: &[u8] = &[
        0xA9, 0x00, 0x8F, 0x00, 0x2C, 0x00, 0x68, 0xEB, 0x68, 0x28, 0x6C, 0xEA, 0xFF, 0x08,
    ];

    let mut stream = Vec::with_capacity(PROLOGUE.len() + data.len() * 6 + EPILOGUE.len());
    stream.extend_from_slice(PROLOGUE);
    for (index, &byte) in data.iter().enumerate() {
        let address = offset + 0x7E_0000 - WRAM_START + index as u32;
        stream.push(0xA9); // LDA #imm
        stream.push(byte);
        stream.push(0x8F); // STA.l
        stream.push((address & 0xFF) as u8);
        stream.push(((address >> 8) & 0xFF) as u8);
        stream.push(((address >> 16) & 0xFF) as u8);
    }
    stream.extend_from_slice(EPILOGUE);
    stream
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_mode_classification() {
        assert_eq!(WriteMode::classify("SD2SNES COM3"), WriteMode::CpuAssisted);
        assert_eq!(WriteMode::classify("FxPak Pro"), WriteMode::CpuAssisted);
        assert_eq!(WriteMode::classify("COM4"), WriteMode::CpuAssisted);
        assert_eq!(WriteMode::classify("RetroArch Localhost"), WriteMode::Direct);
        assert_eq!(WriteMode::classify("emunw Emulator"), WriteMode::Direct);
        // Lower-case "com" inside a word must not trigger serial detection.
        assert_eq!(WriteMode::classify("my.computer emulator"), WriteMode::Direct);
    }

    #[test]
    fn test_store_stream_layout() {
        let offset = WRAM_START + 0xF4D2;
        let stream = compile_store_stream(offset, &[0x42]);
        assert_eq!(stream.len(), 6 + 6 + 14);

        // Single store targets the console address 0x7EF4D2.
        assert_eq!(&stream[6..12], &[0xA9, 0x42, 0x8F, 0xD2, 0xF4, 0x7E]);
    }

    #[test]
    fn test_store_stream_increments_address_per_byte() {
        let offset = WRAM_START + 0x100;
        let stream = compile_store_stream(offset, &[1, 2, 3]);
        assert_eq!(stream.len(), 6 + 3 * 6 + 14);
        assert_eq!(&stream[6..12], &[0xA9, 1, 0x8F, 0x00, 0x01, 0x7E]);
        assert_eq!(&stream[12..18], &[0xA9, 2, 0x8F, 0x01, 0x01, 0x7E]);
        assert_eq!(&stream[18..24], &[0xA9, 3, 0x8F, 0x02, 0x01, 0x7E]);
    }
}
