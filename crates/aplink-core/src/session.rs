//! One bridging session: an attached device, a server connection, and the
//! reconciliation loop between them.
//!
//! The session owns no global state; it is constructed fresh per connection
//! attempt and torn down as a unit. Losing the device ends the session
//! (authentication depends on a device read, so a deviceless session is
//! meaningless); losing the server triggers bounded reconnection while the
//! device remains attached.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::consts::{self, CLIENT_TAGS, GAME_NAME};
use crate::error::Error;
use crate::protocol::{
    ClientMessage, ProtocolVersion, ServerMessage, flatten_print_json,
};
use crate::rom::LocationTable;
use crate::rom::layout::{ROMNAME_SIZE, ROMNAME_START};
use crate::server::{ReconnectPolicy, ServerLink, normalize_address};
use crate::snes::{DeviceSession, SnesMemory};
use crate::storage::CacheStore;
use crate::sync::{SyncEngine, TickOutcome};

/// User console input forwarded into the session.
#[derive(Debug)]
pub enum ConsoleCommand {
    Say(String),
    Sync,
}

/// Why the session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The device is gone; tear down and rediscover after a delay.
    DeviceFault(Error),
    /// Reconnecting will not help (refused, or retries exhausted). The
    /// reason is surfaced to the user.
    Terminal(String),
}

/// Server handshake progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingRoomInfo,
    AwaitingDataPackage,
    Authenticating,
    Connected,
}

enum ConnectionEnd {
    Closed,
    Refused(Vec<String>),
    DeviceFault(Error),
}

pub struct Session<'a> {
    device: &'a DeviceSession,
    store: &'a CacheStore,
    config: &'a Config,
    address: String,
}

impl<'a> Session<'a> {
    pub fn new(
        device: &'a DeviceSession,
        store: &'a CacheStore,
        config: &'a Config,
        server_address: &str,
    ) -> Self {
        Self {
            device,
            store,
            config,
            address: normalize_address(server_address),
        }
    }

    /// Run until the device faults or the server connection is lost for
    /// good. Unexpected closes reconnect on a fixed backoff, up to the
    /// attempt bound.
    pub async fn run(&self, console: &mut mpsc::UnboundedReceiver<ConsoleCommand>) -> SessionEnd {
        let mut policy = ReconnectPolicy::new();
        loop {
            match self.run_connection(&mut policy, console).await {
                ConnectionEnd::Refused(errors) => {
                    policy.note_refused();
                    return SessionEnd::Terminal(format!(
                        "Server refused the connection: {}",
                        errors.join(", ")
                    ));
                }
                ConnectionEnd::DeviceFault(err) => return SessionEnd::DeviceFault(err),
                ConnectionEnd::Closed => match policy.next_attempt(true) {
                    Some(delay) => {
                        warn!(
                            "Server connection lost, reconnecting ({} of {})",
                            policy.attempts(),
                            consts::server::MAX_RECONNECT_ATTEMPTS
                        );
                        sleep(delay).await;
                    }
                    None => {
                        return SessionEnd::Terminal(
                            "Server connection lost and reconnect attempts exhausted".to_string(),
                        );
                    }
                },
            }
        }
    }

    async fn run_connection(
        &self,
        policy: &mut ReconnectPolicy,
        console: &mut mpsc::UnboundedReceiver<ConsoleCommand>,
    ) -> ConnectionEnd {
        let mut link = match ServerLink::connect(&self.address).await {
            Ok(link) => link,
            Err(err) => {
                warn!("Could not reach server at {}: {}", self.address, err);
                return ConnectionEnd::Closed;
            }
        };
        info!("Connected to {}, waiting for room info", self.address);

        let mut phase = Phase::AwaitingRoomInfo;
        let mut table: Option<LocationTable> = None;
        let mut item_names: HashMap<i64, String> = HashMap::new();
        let mut engine: Option<SyncEngine> = None;
        let mut ticking = false;
        let mut console_open = true;

        let mut ticker = interval(consts::sync::TICK_INTERVAL);
        // A tick that overruns its slot is skipped outright, never queued:
        // overlapping ticks could observe a half-written ack index.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                frame = link.recv() => {
                    let commands = match frame {
                        Ok(commands) => commands,
                        Err(_) => return ConnectionEnd::Closed,
                    };
                    for command in commands {
                        let command = match command {
                            Ok(command) => command,
                            Err(err) => {
                                warn!("Ignoring malformed server command: {}", err);
                                continue;
                            }
                        };
                        match command {
                            ServerMessage::RoomInfo(room) => {
                                if let Some(version) = &room.version {
                                    info!("Server version {}", version);
                                }
                                let cached = self.store.load_data_package().unwrap_or_else(|err| {
                                    warn!("Could not read data package cache: {}", err);
                                    None
                                });
                                match cached {
                                    Some(data)
                                        if data.version != 0
                                            && data.version == room.datapackage_version =>
                                    {
                                        debug!("Reusing cached data package version {}", data.version);
                                        table = Some(LocationTable::build(
                                            &data.lookup_any_location_id_to_name,
                                        ));
                                        item_names = data.lookup_any_item_id_to_name;
                                        if let Err(end) = self.authenticate(&mut link).await {
                                            return end;
                                        }
                                        phase = Phase::Authenticating;
                                    }
                                    _ => {
                                        debug!(
                                            "Fetching data package version {}",
                                            room.datapackage_version
                                        );
                                        if link.send(&[ClientMessage::GetDataPackage]).await.is_err() {
                                            return ConnectionEnd::Closed;
                                        }
                                        phase = Phase::AwaitingDataPackage;
                                    }
                                }
                            }
                            ServerMessage::DataPackage { data } => {
                                if let Err(err) = self.store.remember_data_package(&data) {
                                    warn!("Could not cache data package: {}", err);
                                }
                                table = Some(LocationTable::build(
                                    &data.lookup_any_location_id_to_name,
                                ));
                                item_names = data.lookup_any_item_id_to_name;
                                if phase == Phase::AwaitingDataPackage {
                                    if let Err(end) = self.authenticate(&mut link).await {
                                        return end;
                                    }
                                    phase = Phase::Authenticating;
                                }
                            }
                            ServerMessage::Connected(connected) => {
                                info!(
                                    "Joined as slot {} on team {} ({} checked, {} missing)",
                                    connected.slot,
                                    connected.team,
                                    connected.checked_locations.len(),
                                    connected.missing_locations.len()
                                );
                                policy.reset();
                                engine = Some(SyncEngine::new(
                                    table.clone().unwrap_or_default(),
                                    connected.slot,
                                    connected.checked_locations.iter().copied(),
                                    self.config.receive_items,
                                ));
                                ticking = true;
                                phase = Phase::Connected;
                            }
                            ServerMessage::ConnectionRefused { errors } => {
                                return ConnectionEnd::Refused(errors);
                            }
                            ServerMessage::ReceivedItems { items } => {
                                if let Some(engine) = engine.as_mut() {
                                    for item in &items {
                                        let name = item_names
                                            .get(&item.item)
                                            .map(String::as_str)
                                            .unwrap_or("<unknown item>");
                                        debug!("Owed {} from player {}", name, item.player);
                                    }
                                    engine.queue_items(&items);
                                }
                            }
                            ServerMessage::LocationInfo { locations } => {
                                if let Some(engine) = engine.as_mut() {
                                    engine.record_scouts(&locations);
                                }
                            }
                            ServerMessage::RoomUpdate(room) => {
                                if let Some(points) = room.hint_points {
                                    debug!("Hint points: {}", points);
                                }
                            }
                            ServerMessage::Print { text } => {
                                info!("[server] {}", text);
                            }
                            ServerMessage::PrintJSON { data } => {
                                info!("[server] {}", flatten_print_json(&data));
                            }
                        }
                    }
                }

                _ = ticker.tick(), if ticking => {
                    let Some(engine) = engine.as_mut() else { continue };
                    match engine.tick(self.device).await {
                        Ok(report) => {
                            if link.send(&report.messages).await.is_err() {
                                return ConnectionEnd::Closed;
                            }
                            if report.outcome == TickOutcome::Goal {
                                info!("Game complete; reconciliation stopped");
                                ticking = false;
                            }
                        }
                        Err(err) => return ConnectionEnd::DeviceFault(err),
                    }
                }

                command = console.recv(), if console_open => {
                    match command {
                        Some(ConsoleCommand::Say(text)) => {
                            if link.send(&[ClientMessage::Say { text }]).await.is_err() {
                                return ConnectionEnd::Closed;
                            }
                        }
                        Some(ConsoleCommand::Sync) => {
                            if link.send(&[ClientMessage::Sync]).await.is_err() {
                                return ConnectionEnd::Closed;
                            }
                        }
                        None => console_open = false,
                    }
                }
            }
        }
    }

    /// Authenticate using the ROM identity read from the device. Device
    /// readiness is a precondition: there is no fallback identity.
    async fn authenticate(&self, link: &mut ServerLink) -> Result<(), ConnectionEnd> {
        let rom_name = match self.device.read(ROMNAME_START, ROMNAME_SIZE).await {
            Ok(bytes) => bytes,
            Err(err) => return Err(ConnectionEnd::DeviceFault(err)),
        };
        let uuid = match self.store.client_id() {
            Ok(id) => id,
            Err(err) => {
                warn!("Could not persist client id: {}", err);
                "0".to_string()
            }
        };

        debug!("Authenticating with ROM identity");
        let connect = ClientMessage::Connect {
            game: GAME_NAME.to_string(),
            name: base64::encode(&rom_name),
            uuid,
            tags: CLIENT_TAGS.iter().map(|tag| tag.to_string()).collect(),
            password: self.config.password.clone(),
            version: ProtocolVersion::supported(),
        };
        if link.send(&[connect]).await.is_err() {
            return Err(ConnectionEnd::Closed);
        }
        Ok(())
    }
}
