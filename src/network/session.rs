//! Session Lifecycle
//!
//! The public handle over one live room session: the create/join flows, the
//! outgoing command surface, and the keep-alive task. One session is a small
//! set of cooperating tasks (transport reader/writer, dispatch engine,
//! keep-alive) sharing an [`SessionShared`] core; the phase watch channel
//! doubles as their cancellation signal so teardown leaves nothing dangling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::avatar::Avatar;
use crate::core::peer::generate_peer_id;
use crate::core::types::{socket_address_for, Mode, ServerRegion, Team};
use crate::network::dispatch;
use crate::network::lookup::{LookupError, RoomLookup};
use crate::network::protocol::{ClientCommand, ErrorToken};
use crate::network::transport::{CommandSender, Connection, TransportError};
use crate::room::events::SessionEvent;
use crate::room::state::RoomState;

/// Fixed dbid sent by join-room handshakes.
pub(crate) const JOIN_DBID: u32 = 2;

/// Cadence of the keep-alive time-sync ping.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Poll cadence while waiting for establishment.
const ESTABLISH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Capacity of the notification broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Guest dbids are drawn from this range per connection.
const GUEST_DBID_RANGE: std::ops::Range<u32> = 10_000_000..14_000_000;

/// Session lifecycle error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Caller-supplied parameters were invalid; nothing was sent.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The attempt was refused before a transport existed (rate limiting,
    /// address resolution). Fatal to the attempt; never retried.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The server reported an error token during handshake or while
    /// established.
    #[error("server reported error: {0}")]
    Protocol(ErrorToken),

    /// The transport failed underneath the session.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The session is not established.
    #[error("session is not established")]
    NotConnected,
}

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, nothing sent yet.
    Idle,
    /// Transport opening / handshake command in flight.
    Handshaking,
    /// In the room; commands may be sent.
    Established,
    /// Local leave in progress.
    Leaving,
    /// Host-side close in progress.
    Closing,
    /// Ban teardown in progress.
    Banned,
    /// Torn down normally.
    Closed,
    /// Torn down by a fatal error.
    Errored,
}

/// Who the caller is, across all of their sessions.
///
/// Immutable; shared freely between sessions.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Display name.
    pub username: String,
    /// Account session token (None for guests).
    pub token: Option<String>,
    /// Account database id (None for guests).
    pub dbid: Option<u32>,
    /// Guest account.
    pub guest: bool,
    /// Account experience points.
    pub xp: u32,
    /// Avatar sent with handshakes.
    pub avatar: Avatar,
}

impl Identity {
    /// Identity backed by an account.
    pub fn account(
        username: impl Into<String>,
        token: impl Into<String>,
        dbid: u32,
        xp: u32,
        avatar: Avatar,
    ) -> Identity {
        Identity {
            username: username.into(),
            token: Some(token.into()),
            dbid: Some(dbid),
            guest: false,
            xp,
            avatar,
        }
    }

    /// Guest identity. Guest names must be 2..=15 characters.
    pub fn guest(username: impl Into<String>, avatar: Avatar) -> Result<Identity, SessionError> {
        let username = username.into();
        if !(2..=15).contains(&username.chars().count()) {
            return Err(SessionError::Configuration(
                "guest username must be between 2 and 15 characters".into(),
            ));
        }
        Ok(Identity {
            username,
            token: None,
            dbid: None,
            guest: true,
            xp: 0,
            avatar,
        })
    }

    /// Account level derived from xp (guests are level 0).
    pub fn level(&self) -> u32 {
        if self.guest {
            return 0;
        }
        ((f64::from(self.xp) / 100.0).sqrt() + 1.0) as u32
    }
}

/// Parameters of a create-room flow.
#[derive(Debug, Clone)]
pub struct CreateRoomOptions {
    /// Room name.
    pub name: String,
    /// Player capacity, 1..=8.
    pub max_players: u8,
    /// Hide the room from the public list.
    pub hidden: bool,
    /// Room password ("" for none).
    pub password: String,
    /// Minimum level required to join.
    pub min_level: u32,
    /// Maximum level allowed to join.
    pub max_level: u32,
    /// Region to host on.
    pub region: ServerRegion,
}

impl Default for CreateRoomOptions {
    fn default() -> Self {
        CreateRoomOptions {
            name: "Test room".into(),
            max_players: 6,
            hidden: false,
            password: String::new(),
            min_level: 0,
            max_level: 999,
            region: ServerRegion::Warsaw,
        }
    }
}

impl CreateRoomOptions {
    /// Validate against the caller's identity. Runs before any network
    /// action.
    pub fn validate(&self, caller: &Identity) -> Result<(), SessionError> {
        if !(1..=8).contains(&self.max_players) {
            return Err(SessionError::Configuration(
                "max players must be between 1 and 8".into(),
            ));
        }
        if self.min_level > caller.level() {
            return Err(SessionError::Configuration(
                "minimum level cannot exceed the caller's level".into(),
            ));
        }
        if self.max_level < caller.level() {
            return Err(SessionError::Configuration(
                "maximum level cannot be below the caller's level".into(),
            ));
        }
        Ok(())
    }
}

/// Which handshake this session performs once the transport connects.
#[derive(Debug, Clone)]
pub(crate) enum Handshake {
    /// Create-room flow.
    Create {
        /// Validated room parameters.
        options: CreateRoomOptions,
        /// Peer identity for this attempt.
        peer_id: String,
        /// Database id to present (account id or guest draw).
        dbid: u32,
    },
    /// Join-room flow.
    Join {
        /// Resolved join id from the lookup collaborator.
        join_id: String,
        /// Room password to present.
        password: String,
        /// Peer identity for this attempt.
        peer_id: String,
    },
}

/// State shared between the session handle, the dispatch engine and the
/// keep-alive task.
pub(crate) struct SessionShared {
    pub(crate) identity: Identity,
    pub(crate) handshake: Handshake,
    pub(crate) commands: CommandSender,
    pub(crate) room: RwLock<RoomState>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) phase_tx: watch::Sender<SessionPhase>,
    pub(crate) is_host: AtomicBool,
    pub(crate) banned: AtomicBool,
    pub(crate) pending_disconnect: AtomicBool,
    fail_token: Mutex<Option<ErrorToken>>,
}

impl SessionShared {
    /// Current phase.
    pub(crate) fn phase(&self) -> SessionPhase {
        *self.phase_tx.borrow()
    }

    /// Move to a new phase, waking keep-alive and establishment waiters.
    pub(crate) fn set_phase(&self, phase: SessionPhase) {
        self.phase_tx.send_replace(phase);
    }

    /// Publish a notification; subscribers that lag simply miss it.
    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Record the token behind a fatal failure for the establishment
    /// awaiter.
    pub(crate) fn record_failure(&self, token: ErrorToken) {
        if let Ok(mut slot) = self.fail_token.lock() {
            *slot = Some(token);
        }
    }

    fn take_failure(&self) -> Option<ErrorToken> {
        self.fail_token.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Tear the session down: close the transport, clear the mirror, move
    /// to the terminal phase and announce the end. Idempotent; safe to call
    /// from the dispatch engine or the handle.
    pub(crate) async fn teardown(&self, route: SessionPhase) {
        if self.pending_disconnect.swap(true, Ordering::SeqCst) {
            return;
        }
        self.set_phase(route);
        self.commands.close().await;
        self.room.write().await.clear();
        let terminal = if route == SessionPhase::Errored {
            SessionPhase::Errored
        } else {
            SessionPhase::Closed
        };
        self.set_phase(terminal);
        self.publish(SessionEvent::SessionEnded);
    }
}

/// One live room session.
///
/// Obtained from [`Session::create`] or [`Session::join`]. Commands are
/// methods; notifications arrive on the broadcast receiver returned
/// alongside. Dropping the session aborts its background tasks.
pub struct Session {
    shared: Arc<SessionShared>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Host a new room.
    ///
    /// Validates `options` (failing with [`SessionError::Configuration`]
    /// before any network action), connects to the region, performs the
    /// create handshake and waits until the session is established.
    pub async fn create(
        identity: Identity,
        options: CreateRoomOptions,
    ) -> Result<(Session, broadcast::Receiver<SessionEvent>), SessionError> {
        options.validate(&identity)?;
        let address = options.region.socket_address();
        let connection = Connection::connect(&address).await?;
        let dbid = match identity.dbid {
            Some(dbid) => dbid,
            None => rand::thread_rng().gen_range(GUEST_DBID_RANGE),
        };
        let handshake = Handshake::Create {
            options,
            peer_id: generate_peer_id(),
            dbid,
        };
        Session::establish(identity, handshake, connection).await
    }

    /// Join an existing room by its database id.
    ///
    /// Resolves the address through `lookup` first; a rate-limited lookup
    /// fails immediately with [`SessionError::ConnectionRefused`] and never
    /// opens a transport.
    pub async fn join<L: RoomLookup>(
        identity: Identity,
        room_id: u32,
        password: &str,
        lookup: &L,
    ) -> Result<(Session, broadcast::Receiver<SessionEvent>), SessionError> {
        let target = lookup.resolve(room_id).await.map_err(|err| match err {
            LookupError::RateLimited => {
                SessionError::ConnectionRefused("room address lookup was rate limited".into())
            }
            LookupError::Failed(msg) => SessionError::ConnectionRefused(msg),
        })?;
        let connection = Connection::connect(&socket_address_for(&target.server)).await?;
        let handshake = Handshake::Join {
            join_id: target.address,
            password: password.to_string(),
            peer_id: generate_peer_id(),
        };
        Session::establish(identity, handshake, connection).await
    }

    /// Wire a connection up to the dispatch engine and keep-alive task,
    /// then wait for establishment.
    pub(crate) async fn establish(
        identity: Identity,
        handshake: Handshake,
        connection: Connection,
    ) -> Result<(Session, broadcast::Receiver<SessionEvent>), SessionError> {
        let Connection {
            commands,
            frames,
            io_tasks,
        } = connection;

        let room = match &handshake {
            Handshake::Create { options, .. } => {
                RoomState::new(options.name.clone(), options.password.clone(), Mode::Classic)
            }
            Handshake::Join { password, .. } => {
                // The room's name is not known until the server says so.
                RoomState::new("", password.clone(), Mode::Classic)
            }
        };

        let (events, events_rx) = broadcast::channel(EVENT_CAPACITY);
        let (phase_tx, _) = watch::channel(SessionPhase::Handshaking);
        let shared = Arc::new(SessionShared {
            identity,
            handshake,
            commands,
            room: RwLock::new(room),
            events,
            phase_tx,
            is_host: AtomicBool::new(false),
            banned: AtomicBool::new(false),
            pending_disconnect: AtomicBool::new(false),
            fail_token: Mutex::new(None),
        });

        let mut tasks = io_tasks;
        tasks.push(tokio::spawn(dispatch::run(Arc::clone(&shared), frames)));
        tasks.push(tokio::spawn(keep_alive(Arc::clone(&shared))));
        let session = Session { shared, tasks };

        // Block (yielding) until dispatch marks the session established or
        // the attempt dies.
        let phase_rx = session.shared.phase_tx.subscribe();
        loop {
            match *phase_rx.borrow() {
                SessionPhase::Established => break,
                SessionPhase::Errored => {
                    return Err(match session.shared.take_failure() {
                        Some(token) => SessionError::Protocol(token),
                        None => SessionError::Transport(TransportError::Closed),
                    });
                }
                SessionPhase::Closed | SessionPhase::Banned => {
                    return Err(SessionError::NotConnected);
                }
                _ => {}
            }
            tokio::time::sleep(ESTABLISH_POLL_INTERVAL).await;
        }

        Ok((session, events_rx))
    }

    // ── Observation ─────────────────────────────────────────────────

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.shared.phase()
    }

    /// Whether this session currently holds host authority.
    pub fn is_host(&self) -> bool {
        self.shared.is_host.load(Ordering::SeqCst)
    }

    /// Whether this session was banned from its room.
    pub fn is_banned(&self) -> bool {
        self.shared.banned.load(Ordering::SeqCst)
    }

    /// The caller identity this session was opened with.
    pub fn identity(&self) -> &Identity {
        &self.shared.identity
    }

    /// Snapshot of the room mirror.
    pub async fn room(&self) -> RoomState {
        self.shared.room.read().await.clone()
    }

    /// Subscribe to session notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until the session reaches a terminal phase. This is the
    /// run-forever primitive host processes use to keep sessions alive.
    pub async fn closed(&self) {
        let mut phase_rx = self.shared.phase_tx.subscribe();
        loop {
            if matches!(
                *phase_rx.borrow(),
                SessionPhase::Closed | SessionPhase::Errored
            ) {
                return;
            }
            if phase_rx.changed().await.is_err() {
                return;
            }
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Move the local player to `team`.
    pub async fn set_own_team(&self, team: Team) -> Result<(), SessionError> {
        self.send_command(ClientCommand::ChangeOwnTeam { team }).await?;
        self.update_local_player(|p| p.team = team).await;
        Ok(())
    }

    /// Lock or unlock free team switching.
    pub async fn set_team_lock(&self, locked: bool) -> Result<(), SessionError> {
        self.send_command(ClientCommand::SetTeamLock { locked }).await?;
        self.shared.room.write().await.team_lock = locked;
        Ok(())
    }

    /// Send a chat message. The room log is updated when the server echoes
    /// the message back.
    pub async fn send_chat(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.send_command(ClientCommand::Chat {
            message: message.into(),
        })
        .await
    }

    /// Toggle the local ready mark.
    pub async fn set_ready(&self, ready: bool) -> Result<(), SessionError> {
        self.send_command(ClientCommand::SetReady { ready }).await?;
        self.update_local_player(|p| p.ready = ready).await;
        Ok(())
    }

    /// Change the game mode.
    pub async fn set_mode(&self, mode: Mode) -> Result<(), SessionError> {
        self.send_command(ClientCommand::SetMode { mode }).await?;
        self.shared.room.write().await.mode = mode;
        Ok(())
    }

    /// Change rounds to win.
    pub async fn set_rounds(&self, rounds: u16) -> Result<(), SessionError> {
        self.send_command(ClientCommand::SetRounds { rounds }).await?;
        self.shared.room.write().await.rounds = rounds;
        Ok(())
    }

    /// Change the map.
    pub async fn set_map(&self, data: impl Into<String>) -> Result<(), SessionError> {
        let data = data.into();
        self.send_command(ClientCommand::SetMap { data: data.clone() })
            .await?;
        self.shared.room.write().await.map = Some(data);
        Ok(())
    }

    /// Enable or disable extended teams.
    pub async fn set_extended_teams(&self, enabled: bool) -> Result<(), SessionError> {
        self.send_command(ClientCommand::ToggleTeams { enabled }).await?;
        self.shared.room.write().await.extended_teams = enabled;
        Ok(())
    }

    /// Record the last seconds of the current round.
    pub async fn record_replay(&self) -> Result<(), SessionError> {
        self.send_command(ClientCommand::RecordReplay).await
    }

    /// Rename the room.
    pub async fn rename_room(&self, name: impl Into<String>) -> Result<(), SessionError> {
        let name = name.into();
        self.send_command(ClientCommand::RenameRoom { name: name.clone() })
            .await?;
        self.shared.room.write().await.name = name;
        Ok(())
    }

    /// Change the room password ("" clears it).
    pub async fn set_room_password(
        &self,
        password: impl Into<String>,
    ) -> Result<(), SessionError> {
        let password = password.into();
        self.send_command(ClientCommand::SetPassword {
            password: password.clone(),
        })
        .await?;
        self.shared.room.write().await.password = password;
        Ok(())
    }

    /// Move another player to a team.
    pub async fn move_player(&self, short_id: u8, team: Team) -> Result<(), SessionError> {
        self.send_command(ClientCommand::MovePlayer { short_id, team })
            .await?;
        let mut room = self.shared.room.write().await;
        if let Some(player) = room.player_mut(short_id) {
            player.team = team;
        }
        Ok(())
    }

    /// Adjust a player's balance percentage, -100..=100.
    pub async fn balance_player(&self, short_id: u8, percent: i8) -> Result<(), SessionError> {
        if !(-100..=100).contains(&percent) {
            return Err(SessionError::Configuration(
                "balance percentage must be between -100 and 100".into(),
            ));
        }
        self.send_command(ClientCommand::BalancePlayer { short_id, percent })
            .await?;
        let mut room = self.shared.room.write().await;
        if let Some(player) = room.player_mut(short_id) {
            player.balance = percent;
        }
        Ok(())
    }

    /// Kick a player from the room.
    pub async fn kick_player(&self, short_id: u8) -> Result<(), SessionError> {
        self.send_command(ClientCommand::KickBan {
            short_id,
            kick_only: true,
        })
        .await
    }

    /// Ban a player from the room.
    pub async fn ban_player(&self, short_id: u8) -> Result<(), SessionError> {
        self.send_command(ClientCommand::KickBan {
            short_id,
            kick_only: false,
        })
        .await
    }

    /// Hand host authority to another player.
    pub async fn give_host(&self, short_id: u8) -> Result<(), SessionError> {
        self.send_command(ClientCommand::GiveHost { short_id }).await?;
        self.shared.is_host.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Send a friend request to a player.
    pub async fn send_friend_request(&self, short_id: u8) -> Result<(), SessionError> {
        self.send_command(ClientCommand::FriendRequest { short_id })
            .await
    }

    /// Leave the room: disconnect, clear the mirror and end the session.
    pub async fn leave(&self) {
        info!("leaving session");
        self.shared.teardown(SessionPhase::Leaving).await;
    }

    /// Close the room (host only), then leave.
    pub async fn close(&self) -> Result<(), SessionError> {
        if !self.is_host() {
            return Err(SessionError::Configuration(
                "only the host can close the room".into(),
            ));
        }
        self.send_command(ClientCommand::CloseRoom).await?;
        self.shared.teardown(SessionPhase::Closing).await;
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    async fn send_command(&self, command: ClientCommand) -> Result<(), SessionError> {
        if self.shared.phase() != SessionPhase::Established {
            return Err(SessionError::NotConnected);
        }
        self.shared
            .commands
            .emit(command.code(), command.payload())
            .await?;
        Ok(())
    }

    async fn update_local_player(&self, f: impl FnOnce(&mut crate::room::state::Player)) {
        let mut room = self.shared.room.write().await;
        if let Some(player) = room.players.iter_mut().find(|p| p.is_local) {
            f(player);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // No executor is available in Drop; aborting the tasks drops the
        // transport halves and ends the connection.
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Keep-alive task: once the session is established, emit a time-sync ping
/// every five seconds; exit the moment the phase moves on.
async fn keep_alive(shared: Arc<SessionShared>) {
    let mut phase_rx = shared.phase_tx.subscribe();
    loop {
        match *phase_rx.borrow() {
            SessionPhase::Established => break,
            SessionPhase::Closed | SessionPhase::Errored => return,
            _ => {}
        }
        if phase_rx.changed().await.is_err() {
            return;
        }
    }

    let mut ticker = tokio::time::interval(KEEP_ALIVE_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let ping = ClientCommand::TimeSync;
                if shared.commands.emit(ping.code(), ping.payload()).await.is_err() {
                    return;
                }
            }
            changed = phase_rx.changed() => {
                if changed.is_err() || *phase_rx.borrow() != SessionPhase::Established {
                    debug!("keep-alive stopping");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::lookup::RoomAddress;
    use crate::network::protocol::command_codes;
    use crate::network::transport::{parse_packet, Frame, Packet};
    use serde_json::{json, Value};
    use std::future::Future;
    use tokio::sync::mpsc;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(10);

    fn account_identity() -> Identity {
        // xp 1600 -> level 5
        Identity::account("Bob", "session-token", 2, 1600, Avatar::blank())
    }

    struct StaticLookup(Result<RoomAddress, LookupError>);

    impl RoomLookup for StaticLookup {
        fn resolve(
            &self,
            _room_id: u32,
        ) -> impl Future<Output = Result<RoomAddress, LookupError>> + Send {
            let result = self.0.clone();
            async move { result }
        }
    }

    async fn establish_create() -> (
        Session,
        broadcast::Receiver<SessionEvent>,
        mpsc::Sender<Frame>,
        mpsc::Receiver<String>,
    ) {
        let (connection, frame_tx, sent_rx) = Connection::pair();
        let handshake = Handshake::Create {
            options: CreateRoomOptions::default(),
            peer_id: generate_peer_id(),
            dbid: 2,
        };
        let task = tokio::spawn(Session::establish(
            account_identity(),
            handshake,
            connection,
        ));
        frame_tx.send(Frame::Connected).await.unwrap();
        let (session, events) = task.await.unwrap().unwrap();
        (session, events, frame_tx, sent_rx)
    }

    async fn establish_join() -> (
        Session,
        broadcast::Receiver<SessionEvent>,
        mpsc::Sender<Frame>,
        mpsc::Receiver<String>,
    ) {
        let (connection, frame_tx, sent_rx) = Connection::pair();
        let handshake = Handshake::Join {
            join_id: "room-address".into(),
            password: String::new(),
            peer_id: generate_peer_id(),
        };
        let task = tokio::spawn(Session::establish(
            account_identity(),
            handshake,
            connection,
        ));
        frame_tx.send(Frame::Connected).await.unwrap();
        let (session, events) = task.await.unwrap().unwrap();
        (session, events, frame_tx, sent_rx)
    }

    async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
        timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for a session event")
            .expect("event channel closed")
    }

    async fn next_command(rx: &mut mpsc::Receiver<String>) -> (u32, Option<Value>) {
        let pkt = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for an outgoing packet")
            .expect("packet channel closed");
        match parse_packet(&pkt) {
            Packet::Event { code, args } => (code, args.into_iter().next()),
            other => panic!("expected an event packet, got {other:?}"),
        }
    }

    /// Like [`next_command`], skipping keep-alive pings.
    async fn next_command_skipping_pings(
        rx: &mut mpsc::Receiver<String>,
    ) -> (u32, Option<Value>) {
        loop {
            let (code, payload) = next_command(rx).await;
            if code != command_codes::TIME_SYNC {
                return (code, payload);
            }
        }
    }

    async fn roster_with_bob(frame_tx: &mpsc::Sender<Frame>) {
        let players = json!([
            {
                "peerID": "p1",
                "userName": "Bob",
                "guest": false,
                "level": 5,
                "ready": false,
                "tabbed": false,
                "team": 1,
                "avatar": {"layers": [], "bc": 123},
            },
        ]);
        frame_tx
            .send(Frame::Event {
                code: 3,
                args: vec![json!(null), json!(null), players, json!(0)],
            })
            .await
            .unwrap();
    }

    async fn alice_joins(frame_tx: &mpsc::Sender<Frame>) {
        frame_tx
            .send(Frame::Event {
                code: 4,
                args: vec![
                    json!(1),
                    json!("peer-alice"),
                    json!("Alice"),
                    json!(false),
                    json!(3),
                    json!(0),
                    json!({"layers": [], "bc": 9}),
                ],
            })
            .await
            .unwrap();
    }

    // ── Validation before any network action ────────────────────────

    #[tokio::test]
    async fn test_create_rejects_out_of_bounds_max_players() {
        for bad in [0u8, 9] {
            let options = CreateRoomOptions {
                max_players: bad,
                ..Default::default()
            };
            match Session::create(account_identity(), options).await {
                Err(SessionError::Configuration(_)) => {}
                other => panic!("expected configuration error, got {other:?}"),
            }
        }

        let ok = CreateRoomOptions {
            max_players: 8,
            ..Default::default()
        };
        assert!(ok.validate(&account_identity()).is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_level_bounds_outside_caller() {
        // caller is level 5
        let too_high_min = CreateRoomOptions {
            min_level: 6,
            ..Default::default()
        };
        assert!(matches!(
            too_high_min.validate(&account_identity()),
            Err(SessionError::Configuration(_))
        ));

        let too_low_max = CreateRoomOptions {
            max_level: 4,
            ..Default::default()
        };
        assert!(matches!(
            too_low_max.validate(&account_identity()),
            Err(SessionError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_join_rate_limited_is_refused_without_connecting() {
        let lookup = StaticLookup(Err(LookupError::RateLimited));
        match Session::join(account_identity(), 42, "", &lookup).await {
            Err(SessionError::ConnectionRefused(_)) => {}
            other => panic!("expected connection refused, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guest_name_length_is_validated() {
        assert!(Identity::guest("x", Avatar::blank()).is_err());
        assert!(Identity::guest("a".repeat(16), Avatar::blank()).is_err());
        let ok = Identity::guest("guesty", Avatar::blank()).unwrap();
        assert_eq!(ok.level(), 0);
    }

    // ── Handshakes ──────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_create_handshake_seeds_provisional_roster() {
        let (session, _events, _frame_tx, mut sent_rx) = establish_create().await;

        let (code, payload) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::CREATE_ROOM);
        let payload = payload.unwrap();
        assert_eq!(payload["roomName"], "Test room");
        assert_eq!(payload["token"], "session-token");
        assert_eq!(payload["version"], crate::PROTOCOL_VERSION);
        let peer_id = payload["peerID"].as_str().unwrap();
        assert_eq!(peer_id.len(), 16);
        assert!(peer_id.ends_with("000000"));

        assert_eq!(session.phase(), SessionPhase::Established);
        assert!(session.is_host());
        let room = session.room().await;
        assert_eq!(room.players.len(), 1);
        let me = room.local_player().unwrap();
        assert_eq!(me.short_id, 0);
        assert_eq!(me.team, Team::FreeForAll);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_roster_snapshot_marks_local_player() {
        let (session, mut events, frame_tx, mut sent_rx) = establish_join().await;

        let (code, payload) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::JOIN_ROOM);
        assert_eq!(payload.unwrap()["joinID"], "room-address");
        assert!(!session.is_host());

        roster_with_bob(&frame_tx).await;
        assert_eq!(next_event(&mut events).await, SessionEvent::Joined);

        let room = session.room().await;
        assert_eq!(room.players.len(), 1);
        let me = room.local_player().unwrap();
        assert!(me.is_local);
        assert_eq!(me.team, Team::FreeForAll);
        assert_eq!(me.username, "Bob");
        assert!(!room.extended_teams);
    }

    #[tokio::test(start_paused = true)]
    async fn test_roster_with_extended_team_codes_enables_teams() {
        let (session, mut events, frame_tx, _sent_rx) = establish_join().await;

        let players = json!([
            {"peerID": "p1", "userName": "Bob", "level": 5, "team": 1},
            {"peerID": "p2", "userName": "Eve", "level": 9, "team": 3},
        ]);
        frame_tx
            .send(Frame::Event {
                code: 3,
                args: vec![json!(null), json!(null), players, json!(0)],
            })
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::Joined);

        let room = session.room().await;
        assert!(room.extended_teams);
        assert_eq!(room.player(1).unwrap().team, Team::Blue);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_during_handshake_fails_the_flow() {
        let (connection, frame_tx, _sent_rx) = Connection::pair();
        let handshake = Handshake::Join {
            join_id: "room-address".into(),
            password: "bad".into(),
            peer_id: generate_peer_id(),
        };
        let task = tokio::spawn(Session::establish(
            account_identity(),
            handshake,
            connection,
        ));

        frame_tx
            .send(Frame::Event {
                code: 16,
                args: vec![json!("password_wrong")],
            })
            .await
            .unwrap();

        match task.await.unwrap() {
            Err(SessionError::Protocol(ErrorToken::WrongPassword)) => {}
            other => panic!("expected wrong-password failure, got {other:?}"),
        }
    }

    // ── Dispatch semantics ──────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_host_pushes_room_config_to_new_player() {
        let (session, mut events, frame_tx, mut sent_rx) = establish_create().await;
        let (code, _) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::CREATE_ROOM);

        alice_joins(&frame_tx).await;
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::PlayerJoined {
                short_id: 1,
                username: "Alice".into()
            }
        );

        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::HOST_SYNC);
        let payload = payload.unwrap();
        assert_eq!(payload["sid"], 1);
        assert_eq!(payload["gs"]["mo"], "b");
        assert_eq!(payload["gs"]["wl"], 3);

        let room = session.room().await;
        assert_eq!(room.players.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_publishes_only_on_becoming_ready() {
        let (_session, mut events, frame_tx, _sent_rx) = establish_create().await;
        alice_joins(&frame_tx).await;
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::PlayerJoined { .. }
        ));

        let ready = |flag: bool| Frame::Event {
            code: 8,
            args: vec![json!(1), json!(flag)],
        };
        frame_tx.send(ready(true)).await.unwrap();
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::PlayerReady { short_id: 1 }
        );

        // Un-ready publishes nothing; the next observable event is the
        // team lock that follows it.
        frame_tx.send(ready(false)).await.unwrap();
        frame_tx
            .send(Frame::Event {
                code: 19,
                args: vec![json!(true)],
            })
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::TeamLocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_team_lock_toggle_order_and_state() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 19,
                args: vec![json!(true)],
            })
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::TeamLocked);
        assert!(session.room().await.team_lock);

        frame_tx
            .send(Frame::Event {
                code: 19,
                args: vec![json!(false)],
            })
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::TeamUnlocked);
        assert!(!session.room().await.team_lock);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_appends_but_suppresses_local_echo() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;
        alice_joins(&frame_tx).await;
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::PlayerJoined { .. }
        ));

        // Echo of the local player's own message: logged, not announced.
        frame_tx
            .send(Frame::Event {
                code: 20,
                args: vec![json!(0), json!("my own words")],
            })
            .await
            .unwrap();
        // Alice's message is announced.
        frame_tx
            .send(Frame::Event {
                code: 20,
                args: vec![json!(1), json!("hello bob")],
            })
            .await
            .unwrap();

        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::Message {
                author_short_id: 1,
                author_name: "Alice".into(),
                content: "hello bob".into(),
            }
        );
        let room = session.room().await;
        assert_eq!(room.messages.len(), 2);
        assert_eq!(room.messages[0].content, "my own words");
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_kick_closes_without_ban_flag() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 24,
                args: vec![json!(0), json!(true)],
            })
            .await
            .unwrap();

        assert_eq!(next_event(&mut events).await, SessionEvent::LocalKicked);
        assert_eq!(next_event(&mut events).await, SessionEvent::SessionEnded);
        session.closed().await;
        assert_eq!(session.phase(), SessionPhase::Closed);
        assert!(!session.is_banned());
        assert!(session.room().await.players.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_ban_sets_banned_flag() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 24,
                args: vec![json!(0), json!(false)],
            })
            .await
            .unwrap();

        assert_eq!(next_event(&mut events).await, SessionEvent::LocalBanned);
        assert_eq!(next_event(&mut events).await, SessionEvent::SessionEnded);
        session.closed().await;
        assert!(session.is_banned());
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_kick_removes_roster_entry() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;
        alice_joins(&frame_tx).await;
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::PlayerJoined { .. }
        ));

        frame_tx
            .send(Frame::Event {
                code: 24,
                args: vec![json!(1), json!(true)],
            })
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::PlayerKicked {
                short_id: 1,
                username: "Alice".into()
            }
        );

        assert_eq!(session.phase(), SessionPhase::Established);
        let room = session.room().await;
        assert!(room.player(1).is_none());
        assert_eq!(room.players.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advisory_error_does_not_tear_down() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 16,
                args: vec![json!("some_future_warning")],
            })
            .await
            .unwrap();

        match next_event(&mut events).await {
            SessionEvent::Error { token } => {
                assert!(!token.is_fatal());
                assert_eq!(token.as_str(), "some_future_warning");
            }
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(session.phase(), SessionPhase::Established);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_after_establishment_tears_down() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 16,
                args: vec![json!("already_in_this_room")],
            })
            .await
            .unwrap();

        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::Error {
                token: ErrorToken::AlreadyInRoom
            }
        );
        assert_eq!(next_event(&mut events).await, SessionEvent::SessionEnded);
        session.closed().await;
        assert_eq!(session.phase(), SessionPhase::Errored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_change_flips_local_host_flag() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;
        alice_joins(&frame_tx).await;
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::PlayerJoined { .. }
        ));
        assert!(session.is_host());

        frame_tx
            .send(Frame::Event {
                code: 41,
                args: vec![json!({"oldHost": 0, "newHost": 1})],
            })
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::HostChanged {
                old_short_id: 0,
                new_short_id: 1
            }
        );
        assert!(!session.is_host());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_balance_and_teams_events_update_room() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 26,
                args: vec![json!("b"), json!("sp")],
            })
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::ModeChanged {
                mode: Mode::Grapple
            }
        );

        frame_tx
            .send(Frame::Event {
                code: 36,
                args: vec![json!(0), json!(-40)],
            })
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::PlayerBalanced {
                short_id: 0,
                percent: -40
            }
        );

        frame_tx
            .send(Frame::Event {
                code: 39,
                args: vec![json!(true)],
            })
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::TeamsEnabled);

        let room = session.room().await;
        assert_eq!(room.mode, Mode::Grapple);
        assert_eq!(room.player(0).unwrap().balance, -40);
        assert!(room.extended_teams);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_change_is_mirrored_and_harmless() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 29,
                args: vec![json!("opaque-map-payload")],
            })
            .await
            .unwrap();
        // Unknown-shape payloads must be survivable too.
        frame_tx
            .send(Frame::Event {
                code: 29,
                args: vec![json!({"weird": []})],
            })
            .await
            .unwrap();
        // Sentinel so we know both map events were processed.
        frame_tx
            .send(Frame::Event {
                code: 19,
                args: vec![json!(true)],
            })
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::TeamLocked);

        assert_eq!(
            session.room().await.map.as_deref(),
            Some("opaque-map-payload")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_event_codes_are_ignored() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx
            .send(Frame::Event {
                code: 77,
                args: vec![json!("whatever")],
            })
            .await
            .unwrap();
        frame_tx
            .send(Frame::Event {
                code: 19,
                args: vec![json!(true)],
            })
            .await
            .unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::TeamLocked);
        assert_eq!(session.phase(), SessionPhase::Established);
    }

    // ── Outgoing commands ───────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_commands_encode_and_apply_optimistically() {
        let (session, _events, _frame_tx, mut sent_rx) = establish_create().await;
        let (code, _) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::CREATE_ROOM);

        session.set_team_lock(true).await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::TEAM_LOCK);
        assert_eq!(payload.unwrap(), json!({"teamLock": true}));
        assert!(session.room().await.team_lock);

        session.set_ready(true).await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::READY);
        assert_eq!(payload.unwrap(), json!({"ready": true}));
        assert!(session.room().await.local_player().unwrap().ready);

        session.set_mode(Mode::Grapple).await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::SET_MODE);
        assert_eq!(payload.unwrap(), json!({"ga": "b", "mo": "sp"}));
        assert_eq!(session.room().await.mode, Mode::Grapple);

        session.set_own_team(Team::Red).await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::CHANGE_OWN_TEAM);
        assert_eq!(payload.unwrap(), json!({"targetTeam": 2}));
        assert_eq!(
            session.room().await.local_player().unwrap().team,
            Team::Red
        );

        session.rename_room("New name").await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::RENAME_ROOM);
        assert_eq!(payload.unwrap(), json!({"newName": "New name"}));
        assert_eq!(session.room().await.name, "New name");
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_out_of_range_is_rejected_locally() {
        let (session, _events, _frame_tx, mut sent_rx) = establish_create().await;
        let (code, _) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::CREATE_ROOM);

        match session.balance_player(0, 101).await {
            Err(SessionError::Configuration(_)) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }
        match session.balance_player(0, -101).await {
            Err(SessionError::Configuration(_)) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }

        session.balance_player(0, -100).await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::BALANCE);
        assert_eq!(payload.unwrap(), json!({"sid": 0, "bal": -100}));
        assert_eq!(session.room().await.player(0).unwrap().balance, -100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_host_drops_host_flag() {
        let (session, _events, _frame_tx, mut sent_rx) = establish_create().await;
        let (code, _) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::CREATE_ROOM);
        assert!(session.is_host());

        session.give_host(1).await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::GIVE_HOST);
        assert_eq!(payload.unwrap(), json!({"id": 1}));
        assert!(!session.is_host());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_host_only() {
        let (session, _events, _frame_tx, _sent_rx) = establish_join().await;
        match session.close().await {
            Err(SessionError::Configuration(_)) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_sends_room_close_then_ends() {
        let (session, mut events, _frame_tx, mut sent_rx) = establish_create().await;
        let (code, _) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::CREATE_ROOM);

        session.close().await.unwrap();
        let (code, payload) = next_command_skipping_pings(&mut sent_rx).await;
        assert_eq!(code, command_codes::CLOSE_ROOM);
        assert!(payload.is_none());

        loop {
            if next_event(&mut events).await == SessionEvent::SessionEnded {
                break;
            }
        }
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    // ── Lifecycle & keep-alive ──────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_leave_clears_mirror_and_publishes_end() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;
        alice_joins(&frame_tx).await;
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::PlayerJoined { .. }
        ));

        session.leave().await;
        assert_eq!(next_event(&mut events).await, SessionEvent::SessionEnded);
        assert_eq!(session.phase(), SessionPhase::Closed);
        let room = session.room().await;
        assert!(room.players.is_empty());
        assert!(room.messages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_fail_after_leave() {
        let (session, _events, _frame_tx, _sent_rx) = establish_create().await;
        session.leave().await;
        match session.set_ready(true).await {
            Err(SessionError::NotConnected) => {}
            other => panic!("expected not-connected error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_pings_while_established_then_stops() {
        let (session, _events, _frame_tx, mut sent_rx) = establish_create().await;
        let (code, _) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::CREATE_ROOM);

        // First ping fires as soon as the session is established; further
        // ones follow the five second cadence.
        let (code, payload) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::TIME_SYNC);
        assert_eq!(payload.unwrap()["method"], "timesync");

        tokio::time::advance(Duration::from_secs(5)).await;
        let (code, _) = next_command(&mut sent_rx).await;
        assert_eq!(code, command_codes::TIME_SYNC);

        session.leave().await;
        session.closed().await;
        // Let the keep-alive task observe the phase change before the
        // clock moves again.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        // Drain whatever was already queued (including the transport
        // close packet), then verify the ping stream is dead.
        while sent_rx.try_recv().is_ok() {}
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(matches!(sent_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_disconnect_ends_session() {
        let (session, mut events, frame_tx, _sent_rx) = establish_create().await;

        frame_tx.send(Frame::Disconnected).await.unwrap();
        assert_eq!(next_event(&mut events).await, SessionEvent::SessionEnded);
        session.closed().await;
        assert_eq!(session.phase(), SessionPhase::Closed);
    }
}
