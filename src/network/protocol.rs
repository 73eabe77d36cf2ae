//! Protocol Tables
//!
//! The full numbered event surface in one place: inbound server events and
//! their decoders, outbound client commands and their encoders, and the
//! error-token vocabulary. Payloads are JSON values carried inside
//! socket.io event frames; several inbound events use positional argument
//! lists rather than objects.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::types::{Mode, Team};
use crate::room::state::RoomState;

/// Inbound event codes (server → client).
pub mod event_codes {
    #![allow(missing_docs)]
    pub const ROSTER_SNAPSHOT: u32 = 3;
    pub const PLAYER_JOINED: u32 = 4;
    pub const PLAYER_LEFT: u32 = 5;
    pub const READY_CHANGED: u32 = 8;
    pub const PROTOCOL_ERROR: u32 = 16;
    pub const TEAM_CHANGED: u32 = 18;
    pub const TEAM_LOCK: u32 = 19;
    pub const CHAT_MESSAGE: u32 = 20;
    pub const LOBBY_LOADED: u32 = 21;
    pub const KICK_OR_BAN: u32 = 24;
    pub const MODE_CHANGED: u32 = 26;
    pub const MAP_CHANGED: u32 = 29;
    pub const BALANCE_CHANGED: u32 = 36;
    pub const TEAMS_TOGGLED: u32 = 39;
    pub const HOST_CHANGED: u32 = 41;
    pub const ROOM_RENAMED: u32 = 58;
    pub const ROOM_PASSWORD_CHANGED: u32 = 59;
}

/// Outbound command codes (client → server).
pub mod command_codes {
    #![allow(missing_docs)]
    pub const CHANGE_OWN_TEAM: u32 = 6;
    pub const TEAM_LOCK: u32 = 7;
    pub const KICK_BAN: u32 = 9;
    pub const CHAT: u32 = 10;
    pub const HOST_SYNC: u32 = 11;
    pub const CREATE_ROOM: u32 = 12;
    pub const JOIN_ROOM: u32 = 13;
    pub const READY: u32 = 16;
    pub const TIME_SYNC: u32 = 18;
    pub const SET_MODE: u32 = 20;
    pub const SET_ROUNDS: u32 = 21;
    pub const SET_MAP: u32 = 23;
    pub const MOVE_PLAYER: u32 = 26;
    pub const BALANCE: u32 = 29;
    pub const TOGGLE_TEAMS: u32 = 32;
    pub const RECORD_REPLAY: u32 = 33;
    pub const GIVE_HOST: u32 = 34;
    pub const FRIEND_REQUEST: u32 = 35;
    pub const CLOSE_ROOM: u32 = 50;
    pub const RENAME_ROOM: u32 = 52;
    pub const SET_PASSWORD: u32 = 53;
}

/// A server-reported error token.
///
/// The named tokens force session teardown when they arrive; anything else
/// is advisory and leaves the session connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorToken {
    /// Handshake parameters were rejected.
    InvalidParams,
    /// Wrong room password.
    WrongPassword,
    /// The room is full.
    RoomFull,
    /// Caller level above the room's maximum.
    XpTooHigh,
    /// Caller level below the room's minimum.
    XpTooLow,
    /// The room does not admit guests.
    GuestsNotAllowed,
    /// Caller is already in this room.
    AlreadyInRoom,
    /// No room with the requested id.
    RoomNotFound,
    /// Any other token; advisory only.
    Other(String),
}

impl ErrorToken {
    /// Parse a wire token.
    pub fn from_wire(token: &str) -> ErrorToken {
        match token {
            "invalid_params" => ErrorToken::InvalidParams,
            "password_wrong" => ErrorToken::WrongPassword,
            "room_full" => ErrorToken::RoomFull,
            "players_xp_too_high" => ErrorToken::XpTooHigh,
            "players_xp_too_low" => ErrorToken::XpTooLow,
            "guests_not_allowed" => ErrorToken::GuestsNotAllowed,
            "already_in_this_room" => ErrorToken::AlreadyInRoom,
            "room_not_found" => ErrorToken::RoomNotFound,
            other => ErrorToken::Other(other.to_string()),
        }
    }

    /// The wire spelling of this token.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorToken::InvalidParams => "invalid_params",
            ErrorToken::WrongPassword => "password_wrong",
            ErrorToken::RoomFull => "room_full",
            ErrorToken::XpTooHigh => "players_xp_too_high",
            ErrorToken::XpTooLow => "players_xp_too_low",
            ErrorToken::GuestsNotAllowed => "guests_not_allowed",
            ErrorToken::AlreadyInRoom => "already_in_this_room",
            ErrorToken::RoomNotFound => "room_not_found",
            ErrorToken::Other(token) => token,
        }
    }

    /// Whether this token forces session teardown.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorToken::Other(_))
    }
}

impl std::fmt::Display for ErrorToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slot of the initial roster snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    /// Transport-level peer identity.
    #[serde(rename = "peerID", default)]
    pub peer_id: String,
    /// Display name.
    #[serde(rename = "userName")]
    pub username: String,
    /// Playing without an account.
    #[serde(default)]
    pub guest: bool,
    /// Account level.
    #[serde(default)]
    pub level: u32,
    /// Ready flag.
    #[serde(default)]
    pub ready: bool,
    /// Tabbed-out flag.
    #[serde(default)]
    pub tabbed: bool,
    /// Raw team code (kept raw so extended-teams inference sees unknown
    /// codes too).
    #[serde(default = "default_team_code")]
    pub team: u8,
    /// Avatar as a raw JSON value; decoded leniently downstream.
    #[serde(default)]
    pub avatar: Value,
}

fn default_team_code() -> u8 {
    Team::FreeForAll.code()
}

/// A decoded inbound server event.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Initial bulk roster (slot index, entry), null slots skipped.
    RosterSnapshot {
        /// Occupied slots with their indices.
        entries: Vec<(u8, RosterEntry)>,
    },
    /// A new player entered.
    PlayerJoined {
        /// Assigned roster slot.
        short_id: u8,
        /// Transport-level peer identity.
        peer_id: String,
        /// Display name.
        username: String,
        /// Guest flag.
        guest: bool,
        /// Account level.
        level: u32,
        /// Avatar as a raw JSON value.
        avatar: Value,
    },
    /// A player left.
    PlayerLeft {
        /// Vacated roster slot.
        short_id: u8,
    },
    /// A ready flag changed.
    ReadyChanged {
        /// Affected roster slot.
        short_id: u8,
        /// New ready value.
        ready: bool,
    },
    /// The server reported an error token.
    ProtocolError {
        /// The reported token.
        token: ErrorToken,
    },
    /// A player changed teams.
    TeamChanged {
        /// Affected roster slot.
        short_id: u8,
        /// New team.
        team: Team,
    },
    /// Team locking toggled.
    TeamLockChanged {
        /// New lock state.
        locked: bool,
    },
    /// A chat message arrived.
    Chat {
        /// Author roster slot.
        short_id: u8,
        /// Message text.
        content: String,
    },
    /// Lobby snapshot after a round.
    LobbyLoaded {
        /// Mode, when present and recognized.
        mode: Option<Mode>,
        /// Team lock, when present.
        team_lock: Option<bool>,
        /// Rounds to win, when present.
        rounds: Option<u16>,
    },
    /// A player was kicked or banned.
    KickOrBan {
        /// Target roster slot.
        short_id: u8,
        /// True for a plain kick, false for a ban.
        kick_only: bool,
    },
    /// The room switched modes.
    ModeChanged {
        /// The new mode.
        mode: Mode,
    },
    /// The map changed. Payload semantics are not fully known; the raw
    /// value is mirrored and receipt never fails.
    MapChanged {
        /// Raw map payload, when it was a string.
        data: Option<String>,
    },
    /// A balance adjustment changed.
    BalanceChanged {
        /// Affected roster slot.
        short_id: u8,
        /// New adjustment percentage.
        percent: i8,
    },
    /// Extended teams toggled.
    TeamsToggled {
        /// New enabled state.
        enabled: bool,
    },
    /// Host authority moved.
    HostChanged {
        /// Previous host slot.
        old_short_id: u8,
        /// New host slot.
        new_short_id: u8,
    },
    /// The room was renamed.
    RoomRenamed {
        /// New room name.
        name: String,
    },
    /// The room password was set or cleared.
    RoomPasswordChanged {
        /// True when a password is now required.
        set: bool,
    },
}

impl ServerEvent {
    /// Decode a numbered event. Unrecognized codes and malformed payloads
    /// yield `None`; neither is fatal.
    pub fn decode(code: u32, args: &[Value]) -> Option<ServerEvent> {
        if !is_known_code(code) {
            debug!("ignoring unrecognized event code {code}");
            return None;
        }
        let event = Self::decode_known(code, args);
        if event.is_none() {
            warn!("malformed payload for event code {code}: {args:?}");
        }
        event
    }

    fn decode_known(code: u32, args: &[Value]) -> Option<ServerEvent> {
        use event_codes::*;

        match code {
            ROSTER_SNAPSHOT => decode_roster(args),
            PLAYER_JOINED => decode_player_joined(args),
            PLAYER_LEFT => Some(ServerEvent::PlayerLeft {
                short_id: arg_u8(args, 0)?,
            }),
            READY_CHANGED => Some(ServerEvent::ReadyChanged {
                short_id: arg_u8(args, 0)?,
                ready: arg_bool(args, 1)?,
            }),
            PROTOCOL_ERROR => Some(ServerEvent::ProtocolError {
                token: ErrorToken::from_wire(arg_str(args, 0)?),
            }),
            TEAM_CHANGED => {
                let code = arg_u8(args, 1)?;
                match Team::from_code(code) {
                    Some(team) => Some(ServerEvent::TeamChanged {
                        short_id: arg_u8(args, 0)?,
                        team,
                    }),
                    None => {
                        warn!("team change with unknown team code {code}");
                        None
                    }
                }
            }
            TEAM_LOCK => Some(ServerEvent::TeamLockChanged {
                locked: arg_bool(args, 0)?,
            }),
            CHAT_MESSAGE => Some(ServerEvent::Chat {
                short_id: arg_u8(args, 0)?,
                content: arg_str(args, 1)?.to_string(),
            }),
            LOBBY_LOADED => decode_lobby(args),
            KICK_OR_BAN => Some(ServerEvent::KickOrBan {
                short_id: arg_u8(args, 0)?,
                kick_only: arg_bool(args, 1)?,
            }),
            MODE_CHANGED => {
                let token = arg_str(args, 1)?;
                match Mode::from_short_name(token) {
                    Some(mode) => Some(ServerEvent::ModeChanged { mode }),
                    None => {
                        warn!("mode change with unknown mode token {token:?}");
                        None
                    }
                }
            }
            MAP_CHANGED => Some(ServerEvent::MapChanged {
                data: args.first().and_then(Value::as_str).map(str::to_string),
            }),
            BALANCE_CHANGED => Some(ServerEvent::BalanceChanged {
                short_id: arg_u8(args, 0)?,
                percent: arg_i64(args, 1)?.clamp(-100, 100) as i8,
            }),
            TEAMS_TOGGLED => Some(ServerEvent::TeamsToggled {
                enabled: arg_bool(args, 0)?,
            }),
            HOST_CHANGED => {
                let data = args.first()?;
                Some(ServerEvent::HostChanged {
                    old_short_id: data.get("oldHost")?.as_u64()?.try_into().ok()?,
                    new_short_id: data.get("newHost")?.as_u64()?.try_into().ok()?,
                })
            }
            ROOM_RENAMED => Some(ServerEvent::RoomRenamed {
                name: arg_str(args, 0)?.to_string(),
            }),
            ROOM_PASSWORD_CHANGED => Some(ServerEvent::RoomPasswordChanged {
                set: args.first().map(is_truthy)?,
            }),
            _ => None, // gated by is_known_code
        }
    }
}

fn is_known_code(code: u32) -> bool {
    use event_codes::*;
    matches!(
        code,
        ROSTER_SNAPSHOT
            | PLAYER_JOINED
            | PLAYER_LEFT
            | READY_CHANGED
            | PROTOCOL_ERROR
            | TEAM_CHANGED
            | TEAM_LOCK
            | CHAT_MESSAGE
            | LOBBY_LOADED
            | KICK_OR_BAN
            | MODE_CHANGED
            | MAP_CHANGED
            | BALANCE_CHANGED
            | TEAMS_TOGGLED
            | HOST_CHANGED
            | ROOM_RENAMED
            | ROOM_PASSWORD_CHANGED
    )
}

fn decode_roster(args: &[Value]) -> Option<ServerEvent> {
    let slots = args.get(2)?.as_array()?;
    let mut entries = Vec::new();
    for (index, slot) in slots.iter().enumerate() {
        if slot.is_null() {
            continue;
        }
        match serde_json::from_value::<RosterEntry>(slot.clone()) {
            Ok(entry) => entries.push((index as u8, entry)),
            Err(e) => warn!("skipping unparseable roster slot {index}: {e}"),
        }
    }
    Some(ServerEvent::RosterSnapshot { entries })
}

fn decode_player_joined(args: &[Value]) -> Option<ServerEvent> {
    Some(ServerEvent::PlayerJoined {
        short_id: arg_u8(args, 0)?,
        peer_id: arg_str(args, 1)?.to_string(),
        username: arg_str(args, 2)?.to_string(),
        guest: arg_bool(args, 3)?,
        level: arg_u64(args, 4)? as u32,
        avatar: args.get(6).cloned().unwrap_or(Value::Null),
    })
}

fn decode_lobby(args: &[Value]) -> Option<ServerEvent> {
    let data = args.first()?;
    Some(ServerEvent::LobbyLoaded {
        mode: data
            .get("mo")
            .and_then(Value::as_str)
            .and_then(Mode::from_short_name),
        team_lock: data.get("tl").and_then(Value::as_bool),
        rounds: data
            .get("wl")
            .and_then(Value::as_u64)
            .and_then(|w| u16::try_from(w).ok()),
    })
}

fn arg_u64(args: &[Value], index: usize) -> Option<u64> {
    args.get(index)?.as_u64()
}

fn arg_i64(args: &[Value], index: usize) -> Option<i64> {
    args.get(index)?.as_i64()
}

fn arg_u8(args: &[Value], index: usize) -> Option<u8> {
    arg_u64(args, index)?.try_into().ok()
}

fn arg_bool(args: &[Value], index: usize) -> Option<bool> {
    args.get(index)?.as_bool()
}

fn arg_str(args: &[Value], index: usize) -> Option<&str> {
    args.get(index)?.as_str()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        _ => false,
    }
}

/// Identity and room parameters of a create-room handshake.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct CreateRoomRequest {
    pub peer_id: String,
    pub room_name: String,
    pub max_players: u8,
    pub password: String,
    pub dbid: u32,
    pub guest: bool,
    pub guest_name: Option<String>,
    pub token: Option<String>,
    pub min_level: u32,
    pub max_level: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub hidden: bool,
    pub version: u32,
    pub avatar: Value,
}

impl CreateRoomRequest {
    fn payload(&self) -> Value {
        let mut payload = json!({
            "peerID": self.peer_id,
            "roomName": self.room_name,
            "maxPlayers": self.max_players,
            "password": self.password,
            "dbid": self.dbid,
            "guest": self.guest,
            "minLevel": self.min_level,
            "maxLevel": self.max_level,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "country": self.country,
            "version": self.version,
            "hidden": u8::from(self.hidden),
            "quick": false,
            "mode": "custom",
            "avatar": self.avatar,
        });
        if let Some(token) = &self.token {
            payload["token"] = json!(token);
        }
        if let Some(name) = &self.guest_name {
            payload["guestName"] = json!(name);
        }
        payload
    }
}

/// Identity and target of a join-room handshake.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub struct JoinRoomRequest {
    pub peer_id: String,
    pub join_id: String,
    pub password: String,
    pub dbid: u32,
    pub guest: bool,
    pub guest_name: Option<String>,
    pub token: Option<String>,
    pub version: u32,
    pub avatar: Value,
}

impl JoinRoomRequest {
    fn payload(&self) -> Value {
        let mut payload = json!({
            "joinID": self.join_id,
            "roomPassword": self.password,
            "guest": self.guest,
            "dbid": self.dbid,
            "version": self.version,
            "peerID": self.peer_id,
            "bypass": "",
            "avatar": self.avatar,
        });
        if let Some(token) = &self.token {
            payload["token"] = json!(token);
        }
        if let Some(name) = &self.guest_name {
            payload["guestName"] = json!(name);
        }
        payload
    }
}

/// An outgoing numbered command.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    /// Move the local player to a team.
    ChangeOwnTeam {
        /// Target team.
        team: Team,
    },
    /// Lock or unlock team switching.
    SetTeamLock {
        /// New lock state.
        locked: bool,
    },
    /// Kick or ban a player.
    KickBan {
        /// Target roster slot.
        short_id: u8,
        /// True to kick, false to ban.
        kick_only: bool,
    },
    /// Send a chat message.
    Chat {
        /// Message text.
        message: String,
    },
    /// Push room configuration to a newly joined player (host only).
    HostSync {
        /// Target roster slot.
        short_id: u8,
        /// Room configuration blob.
        state: Value,
    },
    /// Create-room handshake.
    CreateRoom(Box<CreateRoomRequest>),
    /// Join-room handshake.
    JoinRoom(Box<JoinRoomRequest>),
    /// Toggle the local ready mark.
    SetReady {
        /// New ready state.
        ready: bool,
    },
    /// Keep-alive time synchronization ping.
    TimeSync,
    /// Change the game mode.
    SetMode {
        /// New mode.
        mode: Mode,
    },
    /// Change rounds to win.
    SetRounds {
        /// New round count.
        rounds: u16,
    },
    /// Change the map.
    SetMap {
        /// Raw map payload.
        data: String,
    },
    /// Move another player to a team.
    MovePlayer {
        /// Target roster slot.
        short_id: u8,
        /// Target team.
        team: Team,
    },
    /// Adjust a player's balance percentage.
    BalancePlayer {
        /// Target roster slot.
        short_id: u8,
        /// Adjustment percentage, -100..=100.
        percent: i8,
    },
    /// Enable or disable extended teams.
    ToggleTeams {
        /// New enabled state.
        enabled: bool,
    },
    /// Record the last seconds of the round.
    RecordReplay,
    /// Transfer host authority.
    GiveHost {
        /// Target roster slot.
        short_id: u8,
    },
    /// Send a friend request.
    FriendRequest {
        /// Target roster slot.
        short_id: u8,
    },
    /// Close the room (host only).
    CloseRoom,
    /// Rename the room.
    RenameRoom {
        /// New name.
        name: String,
    },
    /// Change the room password.
    SetPassword {
        /// New password ("" clears it).
        password: String,
    },
}

impl ClientCommand {
    /// The numbered code this command is sent under.
    pub fn code(&self) -> u32 {
        use command_codes::*;
        match self {
            ClientCommand::ChangeOwnTeam { .. } => CHANGE_OWN_TEAM,
            ClientCommand::SetTeamLock { .. } => TEAM_LOCK,
            ClientCommand::KickBan { .. } => KICK_BAN,
            ClientCommand::Chat { .. } => CHAT,
            ClientCommand::HostSync { .. } => HOST_SYNC,
            ClientCommand::CreateRoom(_) => CREATE_ROOM,
            ClientCommand::JoinRoom(_) => JOIN_ROOM,
            ClientCommand::SetReady { .. } => READY,
            ClientCommand::TimeSync => TIME_SYNC,
            ClientCommand::SetMode { .. } => SET_MODE,
            ClientCommand::SetRounds { .. } => SET_ROUNDS,
            ClientCommand::SetMap { .. } => SET_MAP,
            ClientCommand::MovePlayer { .. } => MOVE_PLAYER,
            ClientCommand::BalancePlayer { .. } => BALANCE,
            ClientCommand::ToggleTeams { .. } => TOGGLE_TEAMS,
            ClientCommand::RecordReplay => RECORD_REPLAY,
            ClientCommand::GiveHost { .. } => GIVE_HOST,
            ClientCommand::FriendRequest { .. } => FRIEND_REQUEST,
            ClientCommand::CloseRoom => CLOSE_ROOM,
            ClientCommand::RenameRoom { .. } => RENAME_ROOM,
            ClientCommand::SetPassword { .. } => SET_PASSWORD,
        }
    }

    /// The JSON payload for this command, if it carries one.
    pub fn payload(&self) -> Option<Value> {
        match self {
            ClientCommand::ChangeOwnTeam { team } => Some(json!({"targetTeam": team.code()})),
            ClientCommand::SetTeamLock { locked } => Some(json!({"teamLock": locked})),
            ClientCommand::KickBan {
                short_id,
                kick_only,
            } => Some(json!({"banshortid": short_id, "kickonly": kick_only})),
            ClientCommand::Chat { message } => Some(json!({"message": message})),
            ClientCommand::HostSync { short_id, state } => {
                Some(json!({"sid": short_id, "gs": state}))
            }
            ClientCommand::CreateRoom(request) => Some(request.payload()),
            ClientCommand::JoinRoom(request) => Some(request.payload()),
            ClientCommand::SetReady { ready } => Some(json!({"ready": ready})),
            ClientCommand::TimeSync => {
                Some(json!({"jsonrpc": "2.0", "id": "9", "method": "timesync"}))
            }
            ClientCommand::SetMode { mode } => {
                Some(json!({"ga": mode.engine(), "mo": mode.short_name()}))
            }
            ClientCommand::SetRounds { rounds } => Some(json!({"w": rounds})),
            ClientCommand::SetMap { data } => Some(json!({"m": data})),
            ClientCommand::MovePlayer { short_id, team } => {
                Some(json!({"targetID": short_id, "targetTeam": team.code()}))
            }
            ClientCommand::BalancePlayer { short_id, percent } => {
                Some(json!({"sid": short_id, "bal": percent}))
            }
            ClientCommand::ToggleTeams { enabled } => Some(json!({"t": enabled})),
            ClientCommand::RecordReplay => None,
            ClientCommand::GiveHost { short_id } => Some(json!({"id": short_id})),
            ClientCommand::FriendRequest { short_id } => Some(json!({"id": short_id})),
            ClientCommand::CloseRoom => None,
            ClientCommand::RenameRoom { name } => Some(json!({"newName": name})),
            ClientCommand::SetPassword { password } => Some(json!({"newPass": password})),
        }
    }
}

/// Build the room-configuration blob the host pushes to a newly joined
/// player.
pub fn host_sync_state(room: &RoomState) -> Value {
    let slot_count = room
        .players
        .iter()
        .map(|p| p.short_id as usize + 1)
        .max()
        .unwrap_or(0);
    let mut balances = vec![0i32; slot_count];
    for player in &room.players {
        balances[player.short_id as usize] = i32::from(player.balance);
    }

    json!({
        "map": placeholder_map(),
        "gt": 2,
        "wl": room.rounds,
        "q": false,
        "tl": room.team_lock,
        "tea": room.extended_teams,
        "ga": room.mode.engine(),
        "mo": room.mode.short_name(),
        "bal": balances,
        "GMMode": "",
    })
}

/// Minimal structurally valid map object for host sync. The raw map payload
/// mirrored in [`RoomState::map`] uses a different encoding and cannot be
/// embedded here.
fn placeholder_map() -> Value {
    json!({
        "v": 13,
        "s": {"re": false, "nc": false, "pq": 1, "gd": 25, "fl": false},
        "physics": {
            "shapes": [],
            "fixtures": [],
            "bodies": [],
            "bro": [],
            "joints": [],
            "ppm": 12,
        },
        "spawns": [],
        "capZones": [],
        "m": {
            "a": "",
            "n": "Unnamed",
            "dbv": 2,
            "dbid": 0,
            "authid": -1,
            "date": "",
            "rxid": 0,
            "rxn": "",
            "rxa": "",
            "rxdb": 1,
            "cr": [],
            "pub": false,
            "mo": "",
            "vu": 0,
            "vd": 0,
        },
    })
}
