//! Event Dispatch Engine
//!
//! The per-session task that consumes transport [`Frame`]s, decodes numbered
//! server events, mutates the room mirror, and republishes them as
//! [`SessionEvent`]s. Also owns the handshake: on transport connect it sends
//! the create/join command and, for create flows, seeds the provisional
//! roster.
//!
//! All mutation of [`RoomState`] here happens behind the session's lock, so
//! dispatch and outgoing-command handlers serialize against each other.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::avatar::{Avatar, DEFAULT_BASE_COLOR};
use crate::core::types::Team;
use crate::network::protocol::{
    host_sync_state, ClientCommand, CreateRoomRequest, JoinRoomRequest, ServerEvent,
};
use crate::network::session::{Handshake, SessionPhase, SessionShared, JOIN_DBID};
use crate::network::transport::Frame;
use crate::room::events::SessionEvent;
use crate::room::state::{ChatMessage, Player};
use crate::PROTOCOL_VERSION;

/// Run the dispatch loop until the transport closes or the session reaches
/// a terminal phase.
pub(crate) async fn run(shared: Arc<SessionShared>, mut frames: mpsc::Receiver<Frame>) {
    while let Some(frame) = frames.recv().await {
        match frame {
            Frame::Connected => handle_connected(&shared).await,
            Frame::Event { code, args } => {
                if let Some(event) = ServerEvent::decode(code, &args) {
                    apply(&shared, event).await;
                }
            }
            Frame::Disconnected => {
                handle_disconnected(&shared).await;
                break;
            }
        }
        if matches!(
            shared.phase(),
            SessionPhase::Closed | SessionPhase::Errored
        ) {
            break;
        }
    }
    debug!("dispatch engine stopped");
}

/// Transport is up: send the handshake command for this session's flow.
async fn handle_connected(shared: &Arc<SessionShared>) {
    let identity = &shared.identity;
    let avatar = serde_json::to_value(&identity.avatar)
        .unwrap_or_else(|_| json!({"layers": [], "bc": DEFAULT_BASE_COLOR}));
    let guest_name = identity.guest.then(|| identity.username.clone());

    let command = match &shared.handshake {
        Handshake::Create {
            options,
            peer_id,
            dbid,
        } => ClientCommand::CreateRoom(Box::new(CreateRoomRequest {
            peer_id: peer_id.clone(),
            room_name: options.name.clone(),
            max_players: options.max_players,
            password: options.password.clone(),
            dbid: *dbid,
            guest: identity.guest,
            guest_name,
            token: identity.token.clone(),
            min_level: options.min_level,
            max_level: options.max_level,
            latitude: options.region.latitude(),
            longitude: options.region.longitude(),
            country: options.region.country().to_string(),
            hidden: options.hidden,
            version: PROTOCOL_VERSION,
            avatar,
        })),
        Handshake::Join {
            join_id,
            password,
            peer_id,
        } => ClientCommand::JoinRoom(Box::new(JoinRoomRequest {
            peer_id: peer_id.clone(),
            join_id: join_id.clone(),
            password: password.clone(),
            dbid: JOIN_DBID,
            guest: identity.guest,
            guest_name,
            token: identity.token.clone(),
            version: PROTOCOL_VERSION,
            avatar,
        })),
    };

    if let Err(e) = shared.commands.emit(command.code(), command.payload()).await {
        error!("failed to send handshake command: {e}");
        shared.teardown(SessionPhase::Errored).await;
        return;
    }

    if let Handshake::Create { peer_id, .. } = &shared.handshake {
        // Provisional seed; overwritten if the server later asserts an
        // authoritative roster snapshot.
        let mut room = shared.room.write().await;
        room.insert_player(Player {
            short_id: 0,
            peer_id: peer_id.clone(),
            username: identity.username.clone(),
            guest: identity.guest,
            level: identity.level(),
            ready: false,
            tabbed: false,
            team: Team::FreeForAll,
            balance: 0,
            avatar: identity.avatar.clone(),
            is_local: true,
        });
        drop(room);
        shared.is_host.store(true, Ordering::SeqCst);
    }

    shared.set_phase(SessionPhase::Established);
    info!("session established as {}", shared.identity.username);
}

/// The transport went away underneath us.
async fn handle_disconnected(shared: &Arc<SessionShared>) {
    if shared.pending_disconnect.load(Ordering::SeqCst) {
        // Local leave/close already tore the session down.
        return;
    }
    info!("transport closed by the server");
    let route = if shared.phase() == SessionPhase::Handshaking {
        SessionPhase::Errored
    } else {
        SessionPhase::Leaving
    };
    shared.teardown(route).await;
}

/// Apply one decoded server event to the room mirror and publish its
/// notification.
async fn apply(shared: &Arc<SessionShared>, event: ServerEvent) {
    match event {
        ServerEvent::RosterSnapshot { entries } => {
            let identity = &shared.identity;
            let mut room = shared.room.write().await;
            room.players.clear();
            let mut any_extended = false;
            for (short_id, entry) in entries {
                if entry.team > Team::FreeForAll.code() {
                    any_extended = true;
                }
                room.players.push(Player {
                    short_id,
                    peer_id: entry.peer_id,
                    username: entry.username,
                    guest: entry.guest,
                    level: entry.level,
                    ready: entry.ready,
                    tabbed: entry.tabbed,
                    team: Team::from_code(entry.team).unwrap_or(Team::FreeForAll),
                    balance: 0,
                    avatar: parse_avatar_value(&entry.avatar),
                    is_local: false,
                });
            }
            let local = room
                .players
                .iter_mut()
                .find(|p| p.username == identity.username && p.level == identity.level());
            match local {
                Some(me) => me.is_local = true,
                None => warn!("roster snapshot does not name the local player"),
            }
            if any_extended {
                room.extended_teams = true;
            }
            drop(room);
            shared.publish(SessionEvent::Joined);
        }

        ServerEvent::PlayerJoined {
            short_id,
            peer_id,
            username,
            guest,
            level,
            avatar,
        } => {
            let mut room = shared.room.write().await;
            room.insert_player(Player {
                short_id,
                peer_id,
                username: username.clone(),
                guest,
                level,
                ready: false,
                tabbed: false,
                team: Team::FreeForAll,
                balance: 0,
                avatar: parse_avatar_value(&avatar),
                is_local: false,
            });
            let sync = shared
                .is_host
                .load(Ordering::SeqCst)
                .then(|| host_sync_state(&room));
            drop(room);

            if let Some(state) = sync {
                let command = ClientCommand::HostSync { short_id, state };
                if let Err(e) = shared.commands.emit(command.code(), command.payload()).await {
                    warn!("failed to push host sync to {short_id}: {e}");
                }
            }
            shared.publish(SessionEvent::PlayerJoined { short_id, username });
        }

        ServerEvent::PlayerLeft { short_id } => {
            let mut room = shared.room.write().await;
            match room.remove_player(short_id) {
                Some(player) => {
                    drop(room);
                    shared.publish(SessionEvent::PlayerLeft {
                        short_id,
                        username: player.username,
                    });
                }
                None => warn!("leave event for unknown short id {short_id}"),
            }
        }

        ServerEvent::ReadyChanged { short_id, ready } => {
            let mut room = shared.room.write().await;
            let became_ready = match room.player_mut(short_id) {
                Some(player) => {
                    let was_ready = player.ready;
                    player.ready = ready;
                    !was_ready && ready
                }
                None => {
                    warn!("ready event for unknown short id {short_id}");
                    false
                }
            };
            drop(room);
            if became_ready {
                shared.publish(SessionEvent::PlayerReady { short_id });
            }
        }

        ServerEvent::ProtocolError { token } => {
            shared.publish(SessionEvent::Error {
                token: token.clone(),
            });
            if token.is_fatal() {
                warn!("fatal protocol error: {token}");
                shared.record_failure(token);
                shared.teardown(SessionPhase::Errored).await;
            }
        }

        ServerEvent::TeamChanged { short_id, team } => {
            let mut room = shared.room.write().await;
            let found = match room.player_mut(short_id) {
                Some(player) => {
                    player.team = team;
                    true
                }
                None => false,
            };
            drop(room);
            if found {
                shared.publish(SessionEvent::TeamChanged { short_id, team });
            } else {
                warn!("team change for unknown short id {short_id}");
            }
        }

        ServerEvent::TeamLockChanged { locked } => {
            shared.room.write().await.team_lock = locked;
            shared.publish(if locked {
                SessionEvent::TeamLocked
            } else {
                SessionEvent::TeamUnlocked
            });
        }

        ServerEvent::Chat { short_id, content } => {
            let mut room = shared.room.write().await;
            let author = room
                .player(short_id)
                .map(|p| (p.username.clone(), p.is_local));
            match author {
                Some((author_name, is_local)) => {
                    room.messages.push(ChatMessage {
                        author_short_id: short_id,
                        author_name: author_name.clone(),
                        content: content.clone(),
                        received_at: Utc::now(),
                    });
                    drop(room);
                    // Local echoes are logged but not re-announced.
                    if !is_local {
                        shared.publish(SessionEvent::Message {
                            author_short_id: short_id,
                            author_name,
                            content,
                        });
                    }
                }
                None => warn!("chat message from unknown short id {short_id}"),
            }
        }

        ServerEvent::LobbyLoaded {
            mode,
            team_lock,
            rounds,
        } => {
            let mut room = shared.room.write().await;
            if let Some(mode) = mode {
                room.mode = mode;
            }
            if let Some(team_lock) = team_lock {
                room.team_lock = team_lock;
            }
            if let Some(rounds) = rounds {
                room.rounds = rounds;
            }
        }

        ServerEvent::KickOrBan {
            short_id,
            kick_only,
        } => {
            let mut room = shared.room.write().await;
            let target_is_local = room.player(short_id).map(|p| p.is_local);
            match target_is_local {
                Some(true) => {
                    drop(room);
                    if kick_only {
                        shared.publish(SessionEvent::LocalKicked);
                        shared.teardown(SessionPhase::Leaving).await;
                    } else {
                        shared.banned.store(true, Ordering::SeqCst);
                        shared.publish(SessionEvent::LocalBanned);
                        shared.teardown(SessionPhase::Banned).await;
                    }
                }
                Some(false) => {
                    let player = room.remove_player(short_id);
                    drop(room);
                    if let Some(player) = player {
                        shared.publish(if kick_only {
                            SessionEvent::PlayerKicked {
                                short_id,
                                username: player.username,
                            }
                        } else {
                            SessionEvent::PlayerBanned {
                                short_id,
                                username: player.username,
                            }
                        });
                    }
                }
                None => warn!("kick/ban for unknown short id {short_id}"),
            }
        }

        ServerEvent::ModeChanged { mode } => {
            shared.room.write().await.mode = mode;
            shared.publish(SessionEvent::ModeChanged { mode });
        }

        ServerEvent::MapChanged { data } => {
            // Payload semantics are only partially known; mirror the raw
            // value when it is a string and never fail on receipt.
            if let Some(data) = data {
                shared.room.write().await.map = Some(data);
            }
        }

        ServerEvent::BalanceChanged { short_id, percent } => {
            let mut room = shared.room.write().await;
            let found = match room.player_mut(short_id) {
                Some(player) => {
                    player.balance = percent;
                    true
                }
                None => false,
            };
            drop(room);
            if found {
                shared.publish(SessionEvent::PlayerBalanced { short_id, percent });
            } else {
                warn!("balance event for unknown short id {short_id}");
            }
        }

        ServerEvent::TeamsToggled { enabled } => {
            shared.room.write().await.extended_teams = enabled;
            shared.publish(if enabled {
                SessionEvent::TeamsEnabled
            } else {
                SessionEvent::TeamsDisabled
            });
        }

        ServerEvent::HostChanged {
            old_short_id,
            new_short_id,
        } => {
            let room = shared.room.read().await;
            let old_local = room.player(old_short_id).map(|p| p.is_local);
            let new_local = room.player(new_short_id).map(|p| p.is_local);
            drop(room);
            match (old_local, new_local) {
                (Some(old_is_local), Some(new_is_local)) => {
                    if old_is_local && !new_is_local {
                        shared.is_host.store(false, Ordering::SeqCst);
                    } else if new_is_local && !old_is_local {
                        shared.is_host.store(true, Ordering::SeqCst);
                    }
                    shared.publish(SessionEvent::HostChanged {
                        old_short_id,
                        new_short_id,
                    });
                }
                _ => warn!(
                    "host change names unknown short ids {old_short_id} -> {new_short_id}"
                ),
            }
        }

        ServerEvent::RoomRenamed { name } => {
            shared.room.write().await.name = name.clone();
            shared.publish(SessionEvent::RoomRenamed { name });
        }

        ServerEvent::RoomPasswordChanged { set } => {
            if set {
                shared.publish(SessionEvent::RoomPasswordSet);
            } else {
                // The cleared state is the only one we can mirror; a
                // remotely set password value is never disclosed.
                shared.room.write().await.password.clear();
                shared.publish(SessionEvent::RoomPasswordCleared);
            }
        }
    }
}

/// Decode an avatar JSON value leniently: anything unparseable becomes the
/// blank avatar rather than poisoning the roster.
fn parse_avatar_value(value: &Value) -> Avatar {
    if value.is_null() {
        return Avatar::blank();
    }
    match serde_json::from_value::<Avatar>(value.clone()) {
        Ok(avatar) => avatar,
        Err(e) => {
            warn!("unparseable avatar payload, using blank: {e}");
            Avatar::blank()
        }
    }
}
