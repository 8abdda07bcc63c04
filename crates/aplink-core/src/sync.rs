//! The reconciliation engine.
//!
//! Once per tick the engine reads the game's live state, delivers at most
//! one pending item, answers scout queries, and diffs every location
//! category against save data to find checks made while the client was not
//! watching (players routinely check locations before connecting, or while
//! disconnected). Newly satisfied locations leave as a single batch.
//!
//! The engine performs no socket I/O itself: device access goes through the
//! [`SnesMemory`] seam and outbound server traffic is returned to the
//! caller. Ticks never overlap; the session task runs them sequentially and
//! skips a tick that would land while the previous one is still running.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ClientStatus, NetworkItem};
use crate::rom::layout::{self, cells, inbox, sweep};
use crate::rom::{Category, Coordinate, LocationTable, locations};
use crate::snes::SnesMemory;

/// What a completed tick means for the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Game not in a checkable state; nothing was done.
    Idle,
    /// Normal tick; keep scheduling.
    Running,
    /// Goal reached; stop scheduling ticks for this session.
    Goal,
}

/// Result of one tick: schedule control plus the server messages to send.
#[derive(Debug)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub messages: Vec<ClientMessage>,
}

impl TickReport {
    fn new(outcome: TickOutcome) -> Self {
        Self { outcome, messages: Vec::new() }
    }
}

/// Snapshot of the 8-byte inbox block the ROM maintains for the client.
#[derive(Debug, Clone, Copy)]
struct InboxSnapshot {
    /// Items the ROM has consumed from the receive order.
    ack_index: u16,
    /// Nonzero while the player sprite is mid-receive animation.
    busy: u8,
    room: u16,
    room_data: u8,
    scout_location: u8,
}

impl InboxSnapshot {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < inbox::LEN as usize {
            return Err(Error::Device(format!("short inbox read: {} bytes", data.len())));
        }
        Ok(Self {
            ack_index: u16::from_le_bytes([data[inbox::ACK_INDEX], data[inbox::ACK_INDEX + 1]]),
            busy: data[inbox::BUSY_FLAG],
            room: u16::from_le_bytes([data[inbox::ROOM_ID], data[inbox::ROOM_ID + 1]]),
            room_data: data[inbox::ROOM_DATA],
            scout_location: data[inbox::SCOUT_LOCATION],
        })
    }
}

pub struct SyncEngine {
    table: LocationTable,
    /// Append-only; never shrinks, duplicate insertions are no-ops.
    checked: BTreeSet<i64>,
    /// Items owed to the player, in server receive order. The device ack
    /// index is re-read every tick and only ever advanced by one.
    pending_items: Vec<NetworkItem>,
    /// Server-resolved scout answers, keyed by location id. Never evicted
    /// within a session.
    scouted: HashMap<i64, NetworkItem>,
    slot: i32,
    receive_items: bool,
    goal_sent: bool,
}

impl SyncEngine {
    pub fn new(
        table: LocationTable,
        slot: i32,
        checked: impl IntoIterator<Item = i64>,
        receive_items: bool,
    ) -> Self {
        Self {
            table,
            checked: checked.into_iter().collect(),
            pending_items: Vec::new(),
            scouted: HashMap::new(),
            slot,
            receive_items,
            goal_sent: false,
        }
    }

    /// Append server-pushed items to the pending queue, in order.
    pub fn queue_items(&mut self, items: &[NetworkItem]) {
        self.pending_items.extend_from_slice(items);
        debug!("Pending item queue now holds {} items", self.pending_items.len());
    }

    /// Record scout answers. The first answer for a location wins.
    pub fn record_scouts(&mut self, locations: &[NetworkItem]) {
        for entry in locations {
            self.scouted.entry(entry.location).or_insert(*entry);
        }
    }

    pub fn checked(&self) -> &BTreeSet<i64> {
        &self.checked
    }

    pub fn pending_items(&self) -> usize {
        self.pending_items.len()
    }

    /// Run one reconciliation pass.
    ///
    /// A device fault aborts the tick before the checked set is touched, so
    /// an interrupted pass never reports half-observed state.
    pub async fn tick(&mut self, mem: &dyn SnesMemory) -> Result<TickReport> {
        let mode = mem.read(layout::GAME_MODE_ADDR, 1).await?;
        let mode = *mode.first().ok_or_else(|| Error::Device("empty mode read".into()))?;
        let in_game = layout::INGAME_MODES.contains(&mode);
        let end_game = layout::ENDGAME_MODES.contains(&mode);
        if !in_game && !end_game {
            return Ok(TickReport::new(TickOutcome::Idle));
        }

        let game_over = mem.read(layout::GAME_OVER_ADDR, 1).await?;
        if game_over.first().copied().unwrap_or(0) != 0 || end_game {
            let mut report = TickReport::new(TickOutcome::Goal);
            if !self.goal_sent {
                info!("Goal reached, reporting completion");
                self.goal_sent = true;
                report
                    .messages
                    .push(ClientMessage::StatusUpdate { status: ClientStatus::Goal });
            }
            return Ok(report);
        }

        let raw = mem.read(cells::RECEIVED_ITEMS_INDEX, inbox::LEN).await?;
        let snapshot = InboxSnapshot::parse(&raw)?;

        let mut report = TickReport::new(TickOutcome::Running);

        self.deliver_next_item(mem, &snapshot).await?;
        self.answer_scout(mem, &snapshot, &mut report.messages).await?;

        let mut new_checks: Vec<i64> = Vec::new();
        self.check_shop(mem, &snapshot, &mut new_checks).await?;
        self.check_current_room(&snapshot, &mut new_checks);
        self.sweep_underworld(mem, &mut new_checks).await?;
        self.sweep_overworld(mem, &mut new_checks).await?;
        self.sweep_npc(mem, &mut new_checks).await?;
        self.sweep_misc(mem, &mut new_checks).await?;

        if !new_checks.is_empty() {
            info!("{} newly checked locations", new_checks.len());
            self.checked.extend(new_checks.iter().copied());
            report.messages.push(ClientMessage::LocationChecks { locations: new_checks });
        }

        Ok(report)
    }

    /// Deliver the next pending item, if the ROM is ready for one. At most
    /// one item per tick, so delivery speed is bounded by the tick cadence.
    async fn deliver_next_item(&self, mem: &dyn SnesMemory, snapshot: &InboxSnapshot) -> Result<()> {
        let ack = snapshot.ack_index as usize;
        if !self.receive_items || ack >= self.pending_items.len() || snapshot.busy != 0 {
            return Ok(());
        }

        let item = self.pending_items[ack];
        debug!("Delivering item {} (index {})", item.item, ack);

        // Strict order: advance the ack index, then the payload, then the
        // sender. The queue's FIFO discipline keeps other traffic out.
        let next_index = (snapshot.ack_index + 1).to_le_bytes();
        mem.write(cells::RECEIVED_ITEMS_INDEX, &next_index).await?;
        mem.write(cells::RECEIVED_ITEM_ADDR, &[item.item as u8]).await?;

        // Items from the local player are not attributed.
        let sender = if item.player == self.slot { 0 } else { item.player as u8 };
        mem.write(cells::RECEIVED_ITEM_SENDER_ADDR, &[sender]).await?;
        Ok(())
    }

    /// Resolve the "what is lying here" query for the location the player
    /// is standing on. Unknown locations are asked of the server; known
    /// ones are written back for the ROM to render.
    async fn answer_scout(
        &self,
        mem: &dyn SnesMemory,
        snapshot: &InboxSnapshot,
        messages: &mut Vec<ClientMessage>,
    ) -> Result<()> {
        if snapshot.scout_location == 0 {
            return Ok(());
        }
        let location = snapshot.scout_location as i64;

        match self.scouted.get(&location) {
            None => {
                messages.push(ClientMessage::LocationScouts { locations: vec![location] });
            }
            Some(entry) => {
                mem.write(cells::SCOUTREPLY_LOCATION_ADDR, &[snapshot.scout_location]).await?;
                mem.write(cells::SCOUTREPLY_ITEM_ADDR, &[entry.item as u8]).await?;
                mem.write(cells::SCOUTREPLY_PLAYER_ADDR, &[entry.player as u8]).await?;
            }
        }
        Ok(())
    }

    /// Shops share inventory slots, so the whole purchase block is checked
    /// whenever the player stands in any shop room.
    async fn check_shop(
        &self,
        mem: &dyn SnesMemory,
        snapshot: &InboxSnapshot,
        out: &mut Vec<i64>,
    ) -> Result<()> {
        if !locations::is_shop_room(snapshot.room) {
            return Ok(());
        }

        let data = mem.read(cells::SHOP_ADDR, locations::SHOP_SLOT_COUNT).await?;
        for (index, &slot) in data.iter().enumerate() {
            if slot != 0 {
                self.push_new(out, locations::SHOP_ID_START + index as i64);
            }
        }
        Ok(())
    }

    /// Test the locations of the current room against the bitmask byte the
    /// ROM mirrors into the inbox.
    fn check_current_room(&self, snapshot: &InboxSnapshot, out: &mut Vec<i64>) {
        for location in self.table.in_room(Category::Underworld, snapshot.room) {
            let Coordinate::Room { mask, .. } = location.coord else {
                continue;
            };
            if ((snapshot.room_data as u16) << 4) & mask != 0 {
                self.push_new(out, location.id);
            }
        }
    }

    /// One read covering the minimal span of unchecked underworld rooms,
    /// then a bitmask test per room state word.
    async fn sweep_underworld(&self, mem: &dyn SnesMemory, out: &mut Vec<i64>) -> Result<()> {
        let mut begin = u16::MAX;
        let mut end = 0u16;
        let mut missing = Vec::new();
        for location in self.table.in_category(Category::Underworld) {
            if self.checked.contains(&location.id) {
                continue;
            }
            let Coordinate::Room { room, mask } = location.coord else {
                continue;
            };
            missing.push((location.id, room, mask));
            begin = begin.min(room);
            end = end.max(room + 1);
        }
        if begin >= end {
            return Ok(());
        }

        let span = mem
            .read(sweep::UNDERWORLD_BASE + begin as u32 * 2, (end - begin) as u32 * 2)
            .await?;
        for (id, room, mask) in missing {
            let offset = (room - begin) as usize * 2;
            let word = u16::from_le_bytes([span[offset], span[offset + 1]]);
            if word & mask != 0 {
                self.push_new(out, id);
            }
        }
        Ok(())
    }

    /// One read covering the minimal span of unchecked overworld screens.
    async fn sweep_overworld(&self, mem: &dyn SnesMemory, out: &mut Vec<i64>) -> Result<()> {
        let mut begin = u16::MAX;
        let mut end = 0u16;
        let mut missing = Vec::new();
        for location in self.table.in_category(Category::Overworld) {
            if self.checked.contains(&location.id) {
                continue;
            }
            let Coordinate::Screen { screen } = location.coord else {
                continue;
            };
            missing.push((location.id, screen));
            begin = begin.min(screen);
            end = end.max(screen + 1);
        }
        if begin >= end {
            return Ok(());
        }

        let span = mem
            .read(sweep::OVERWORLD_BASE + begin as u32, (end - begin) as u32)
            .await?;
        for (id, screen) in missing {
            if span[(screen - begin) as usize] & sweep::OVERWORLD_COLLECT_BIT != 0 {
                self.push_new(out, id);
            }
        }
        Ok(())
    }

    /// NPC gifts all live in one event flag word.
    async fn sweep_npc(&self, mem: &dyn SnesMemory, out: &mut Vec<i64>) -> Result<()> {
        let missing: Vec<_> = self
            .table
            .in_category(Category::Npc)
            .filter(|location| !self.checked.contains(&location.id))
            .map(|location| (location.id, location.coord))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let data = mem.read(sweep::NPC_FLAGS_ADDR, 2).await?;
        let flags = u16::from_le_bytes([data[0], data[1]]);
        for (id, coord) in missing {
            let Coordinate::Event { mask } = coord else {
                continue;
            };
            if flags & mask != 0 {
                self.push_new(out, id);
            }
        }
        Ok(())
    }

    /// The few locations tracked in the misc flag bytes.
    async fn sweep_misc(&self, mem: &dyn SnesMemory, out: &mut Vec<i64>) -> Result<()> {
        let missing: Vec<_> = self
            .table
            .in_category(Category::Misc)
            .filter(|location| !self.checked.contains(&location.id))
            .map(|location| (location.id, location.coord))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let data = mem.read(sweep::MISC_BASE, sweep::MISC_LEN).await?;
        for (id, coord) in missing {
            let Coordinate::Room { room, mask } = coord else {
                continue;
            };
            let byte = data[(room - sweep::MISC_FIRST) as usize];
            if byte & mask as u8 != 0 {
                self.push_new(out, id);
            }
        }
        Ok(())
    }

    /// Accumulate a newly satisfied location, once. Locations already
    /// reported in an earlier tick are never re-reported.
    fn push_new(&self, out: &mut Vec<i64>, id: i64) {
        if !self.checked.contains(&id) && !out.contains(&id) {
            out.push(id);
        }
    }
}
