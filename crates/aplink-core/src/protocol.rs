//! Multiworld server wire protocol.
//!
//! Every WebSocket text frame carries a JSON array of command objects, each
//! tagged with a `cmd` field. Decoding happens per element so one malformed
//! command surfaces as a typed error without poisoning its siblings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::error::{Error, Result};

/// Client lifecycle status reported through `StatusUpdate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum ClientStatus {
    Unknown = 0,
    Ready = 10,
    Playing = 20,
    Goal = 30,
}

impl From<ClientStatus> for u8 {
    fn from(status: ClientStatus) -> u8 {
        status as u8
    }
}

/// Protocol version tuple, transmitted with a `class` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
    #[serde(default)]
    pub class: String,
}

impl ProtocolVersion {
    /// The server protocol version this client implements.
    pub fn supported() -> Self {
        Self {
            major: consts::version::MAJOR,
            minor: consts::version::MINOR,
            build: consts::version::BUILD,
            class: "Version".to_string(),
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// An item resting at (or sent from) a location, as the server reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkItem {
    pub item: i64,
    pub location: i64,
    pub player: i32,
}

/// A player in the current room. Older servers transmit these as 4-tuples,
/// newer ones as objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkPlayer {
    Named {
        team: i32,
        slot: i32,
        alias: String,
        name: String,
    },
    Tuple(i32, i32, String, String),
}

impl NetworkPlayer {
    pub fn slot(&self) -> i32 {
        match self {
            NetworkPlayer::Named { slot, .. } => *slot,
            NetworkPlayer::Tuple(_, slot, _, _) => *slot,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            NetworkPlayer::Named { alias, .. } => alias,
            NetworkPlayer::Tuple(_, _, alias, _) => alias,
        }
    }
}

/// One fragment of a formatted console message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonMessagePart {
    #[serde(rename = "type", default)]
    pub part_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Room parameters sent on connect and on change.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomInfo {
    #[serde(default)]
    pub version: Option<ProtocolVersion>,
    #[serde(default)]
    pub forfeit_mode: Option<String>,
    #[serde(default)]
    pub remaining_mode: Option<String>,
    #[serde(default)]
    pub hint_cost: Option<i64>,
    #[serde(default)]
    pub location_check_points: Option<i64>,
    #[serde(default)]
    pub hint_points: Option<i64>,
    #[serde(default)]
    pub datapackage_version: i64,
}

/// Successful authentication payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Connected {
    pub team: i32,
    pub slot: i32,
    #[serde(default)]
    pub players: Vec<NetworkPlayer>,
    #[serde(default)]
    pub checked_locations: Vec<i64>,
    #[serde(default)]
    pub missing_locations: Vec<i64>,
}

/// Versioned id-to-name lookups for locations and items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataPackageData {
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub lookup_any_location_id_to_name: HashMap<i64, String>,
    #[serde(default)]
    pub lookup_any_item_id_to_name: HashMap<i64, String>,
}

/// Commands the server sends to this client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd")]
pub enum ServerMessage {
    RoomInfo(RoomInfo),
    Connected(Connected),
    ConnectionRefused {
        #[serde(default)]
        errors: Vec<String>,
    },
    ReceivedItems {
        items: Vec<NetworkItem>,
    },
    LocationInfo {
        locations: Vec<NetworkItem>,
    },
    RoomUpdate(RoomInfo),
    Print {
        text: String,
    },
    PrintJSON {
        data: Vec<JsonMessagePart>,
    },
    DataPackage {
        data: DataPackageData,
    },
}

/// Commands this client sends to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd")]
pub enum ClientMessage {
    Connect {
        game: String,
        name: String,
        uuid: String,
        tags: Vec<String>,
        password: Option<String>,
        version: ProtocolVersion,
    },
    LocationChecks {
        locations: Vec<i64>,
    },
    LocationScouts {
        locations: Vec<i64>,
    },
    StatusUpdate {
        status: ClientStatus,
    },
    GetDataPackage,
    Say {
        text: String,
    },
    Sync,
}

/// Decode one inbound text frame into its commands.
///
/// The outer array must parse; each element decodes independently so a
/// malformed command yields `Error::Protocol` for that element only.
pub fn decode_frame(text: &str) -> Result<Vec<Result<ServerMessage>>> {
    let elements: Vec<serde_json::Value> = serde_json::from_str(text)?;
    Ok(elements
        .into_iter()
        .map(|element| {
            let cmd = element
                .get("cmd")
                .and_then(|v| v.as_str())
                .unwrap_or("<missing cmd>")
                .to_string();
            serde_json::from_value(element).map_err(|err| Error::Protocol(format!("{cmd}: {err}")))
        })
        .collect())
}

/// Encode outbound commands as one text frame.
pub fn encode_frame(messages: &[ClientMessage]) -> Result<String> {
    Ok(serde_json::to_string(messages)?)
}

/// Collapse a `PrintJSON` part list into a plain line of text.
pub fn flatten_print_json(parts: &[JsonMessagePart]) -> String {
    parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_room_info() {
        let frame = r#"[{"cmd":"RoomInfo","version":{"major":0,"minor":0,"build":3,"class":"Version"},
            "forfeit_mode":"auto","remaining_mode":"goal","hint_cost":10,
            "location_check_points":1,"datapackage_version":4}]"#;
        let messages = decode_frame(frame).unwrap();
        assert_eq!(messages.len(), 1);
        match messages[0].as_ref().unwrap() {
            ServerMessage::RoomInfo(info) => {
                assert_eq!(info.datapackage_version, 4);
                assert_eq!(info.forfeit_mode.as_deref(), Some("auto"));
                assert_eq!(info.version.as_ref().unwrap().to_string(), "0.0.3");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_decode_connected_with_tuple_players() {
        let frame = r#"[{"cmd":"Connected","team":0,"slot":2,
            "players":[[0,1,"Alice","Alice"],[0,2,"Bob","Bob"]],
            "checked_locations":[1,2,3],"missing_locations":[4]}]"#;
        let messages = decode_frame(frame).unwrap();
        match messages[0].as_ref().unwrap() {
            ServerMessage::Connected(connected) => {
                assert_eq!(connected.slot, 2);
                assert_eq!(connected.checked_locations, vec![1, 2, 3]);
                assert_eq!(connected.players[1].alias(), "Bob");
                assert_eq!(connected.players[1].slot(), 2);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_element_does_not_poison_frame() {
        let frame = r#"[{"cmd":"Print","text":"hello"},{"cmd":"Connected","team":"oops"},{"cmd":"Bogus"}]"#;
        let messages = decode_frame(frame).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].is_ok());
        assert!(matches!(messages[1], Err(Error::Protocol(_))));
        assert!(matches!(messages[2], Err(Error::Protocol(_))));
    }

    #[test]
    fn test_encode_connect() {
        let message = ClientMessage::Connect {
            game: consts::GAME_NAME.to_string(),
            name: "VGVzdFJvbQ==".to_string(),
            uuid: "12345".to_string(),
            tags: vec!["LttP Client".to_string()],
            password: None,
            version: ProtocolVersion::supported(),
        };
        let frame = encode_frame(std::slice::from_ref(&message)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value[0]["cmd"], "Connect");
        assert_eq!(value[0]["game"], "A Link to the Past");
        assert_eq!(value[0]["version"]["class"], "Version");
    }

    #[test]
    fn test_encode_status_update_as_integer() {
        let frame = encode_frame(&[ClientMessage::StatusUpdate {
            status: ClientStatus::Goal,
        }])
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value[0]["status"], 30);
    }

    #[test]
    fn test_encode_unit_commands() {
        let frame = encode_frame(&[ClientMessage::Sync, ClientMessage::GetDataPackage]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value[0]["cmd"], "Sync");
        assert_eq!(value[1]["cmd"], "GetDataPackage");
    }

    #[test]
    fn test_flatten_print_json() {
        let frame = r#"[{"cmd":"PrintJSON","data":[
            {"type":"player_id","text":"Alice"},
            {"text":" found "},
            {"type":"item_id","text":"Hookshot"}]}]"#;
        let messages = decode_frame(frame).unwrap();
        match messages[0].as_ref().unwrap() {
            ServerMessage::PrintJSON { data } => {
                assert_eq!(flatten_print_json(data), "Alice found Hookshot");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_decode_data_package() {
        let frame = r#"[{"cmd":"DataPackage","data":{"version":5,
            "lookup_any_location_id_to_name":{"1572864":"Blind's Hideout - Top"},
            "lookup_any_item_id_to_name":{"66":"Hookshot"}}}]"#;
        let messages = decode_frame(frame).unwrap();
        match messages[0].as_ref().unwrap() {
            ServerMessage::DataPackage { data } => {
                assert_eq!(data.version, 5);
                assert_eq!(
                    data.lookup_any_location_id_to_name.get(&1572864).map(String::as_str),
                    Some("Blind's Hideout - Top")
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
