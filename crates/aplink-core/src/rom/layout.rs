//! SNES memory layout constants for the randomized ROM.
//!
//! Addresses are in the daemon's flat address space: WRAM is mirrored at
//! 0xF50000 and cartridge SRAM at 0xE00000. All multi-byte cells are
//! little-endian.

/// Base of the WRAM mirror in the daemon address space.
pub const WRAM_START: u32 = 0xF5_0000;
pub const WRAM_SIZE: u32 = 0x2_0000;

/// Base of cartridge SRAM in the daemon address space.
pub const SRAM_START: u32 = 0xE0_0000;

/// ROM name window, used to authenticate against the multiworld server.
pub const ROMNAME_START: u32 = SRAM_START + 0x2000;
pub const ROMNAME_SIZE: u32 = 0x15;

/// Game-mode cell (1 byte, WRAM). Values outside the mode tables below mean
/// the game is not in a checkable state (title screen, file select, ...).
pub const GAME_MODE_ADDR: u32 = WRAM_START + 0x10;

/// Game-mode values during normal play.
pub const INGAME_MODES: &[u8] = &[0x07, 0x09, 0x0b];

/// Game-mode values once the goal has been reached.
pub const ENDGAME_MODES: &[u8] = &[0x19, 0x1a];

/// Start of the save-data block inside WRAM.
pub const SAVEDATA_START: u32 = WRAM_START + 0xF000;
pub const SAVEDATA_SIZE: u32 = 0x500;

/// Goal/completion cell (1 byte). Nonzero once the player has won.
pub const GAME_OVER_ADDR: u32 = SAVEDATA_START + 0x443;

/// Save-data cells used to exchange multiworld state with the ROM.
pub mod cells {
    use super::SAVEDATA_START;

    /// Count of items the ROM has consumed from the server's receive order
    /// (2 bytes). Stored in save data so it survives a client restart.
    pub const RECEIVED_ITEMS_INDEX: u32 = SAVEDATA_START + 0x4D0;

    /// Item payload cell written when delivering an item (1 byte).
    pub const RECEIVED_ITEM_ADDR: u32 = SAVEDATA_START + 0x4D2;

    /// Slot id of the player who sent the delivered item (1 byte).
    pub const RECEIVED_ITEM_SENDER_ADDR: u32 = SAVEDATA_START + 0x4D3;

    /// Current room id (2 bytes).
    pub const ROOMID_ADDR: u32 = SAVEDATA_START + 0x4D4;

    /// Satisfied-check bitmask of the current room (1 byte).
    pub const ROOMDATA_ADDR: u32 = SAVEDATA_START + 0x4D6;

    /// Location id the player is currently standing on, if it holds a
    /// remote item (1 byte, 0 when none).
    pub const SCOUT_LOCATION_ADDR: u32 = SAVEDATA_START + 0x4D7;

    /// Scout reply cells, written back once the server resolves a scout.
    pub const SCOUTREPLY_LOCATION_ADDR: u32 = SAVEDATA_START + 0x4D8;
    pub const SCOUTREPLY_ITEM_ADDR: u32 = SAVEDATA_START + 0x4D9;
    pub const SCOUTREPLY_PLAYER_ADDR: u32 = SAVEDATA_START + 0x4DA;

    /// Start of the shop purchase-state block.
    pub const SHOP_ADDR: u32 = SAVEDATA_START + 0x302;
}

/// The 8-byte inbox block read once per tick, starting at
/// [`cells::RECEIVED_ITEMS_INDEX`]. Byte offsets within that read:
pub mod inbox {
    /// Device-acknowledged receive count, u16 LE (bytes 0-1).
    pub const ACK_INDEX: usize = 0;
    /// Nonzero while the player sprite is busy receiving an item (byte 2).
    pub const BUSY_FLAG: usize = 2;
    /// Current room id, u16 LE (bytes 4-5).
    pub const ROOM_ID: usize = 4;
    /// Current room's check bitmask byte (byte 6).
    pub const ROOM_DATA: usize = 6;
    /// Scouted location id, 0 when none (byte 7).
    pub const SCOUT_LOCATION: usize = 7;
    /// Total length of the inbox read.
    pub const LEN: u32 = 8;
}

/// Save-data offsets swept for checks outside the current room.
pub mod sweep {
    use super::SAVEDATA_START;

    /// Underworld room state words live at `SAVEDATA_START + room * 2`.
    pub const UNDERWORLD_BASE: u32 = SAVEDATA_START;

    /// Overworld screen flag bytes.
    pub const OVERWORLD_BASE: u32 = SAVEDATA_START + 0x280;

    /// Bit set in a screen byte once its item has been collected.
    pub const OVERWORLD_COLLECT_BIT: u8 = 0x40;

    /// NPC event flag word (2 bytes).
    pub const NPC_FLAGS_ADDR: u32 = SAVEDATA_START + 0x410;

    /// Miscellaneous flag bytes, indexed 0x3c6..=0x3c9 in save data.
    pub const MISC_BASE: u32 = SAVEDATA_START + 0x3c6;
    pub const MISC_FIRST: u16 = 0x3c6;
    pub const MISC_LEN: u32 = 4;
}
