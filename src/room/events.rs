//! Session Notifications
//!
//! Semantic, subscriber-facing notifications republished by the dispatch
//! engine after it has applied the corresponding wire event to the room
//! mirror. Delivered over a `tokio::sync::broadcast` channel; slow
//! subscribers lag rather than block dispatch.

use crate::core::types::{Mode, Team};
use crate::network::protocol::ErrorToken;

/// A notification about the session or its room.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The initial roster snapshot has been applied; the session is in the
    /// room.
    Joined,
    /// Another player entered the room.
    PlayerJoined {
        /// Roster slot of the new player.
        short_id: u8,
        /// Display name of the new player.
        username: String,
    },
    /// A player left the room.
    PlayerLeft {
        /// Roster slot that was vacated.
        short_id: u8,
        /// Display name of the departed player.
        username: String,
    },
    /// A player switched to ready (un-ready transitions are not announced).
    PlayerReady {
        /// Roster slot of the ready player.
        short_id: u8,
    },
    /// The server reported an error token.
    Error {
        /// Raw token; fatal tokens also end the session.
        token: ErrorToken,
    },
    /// A player changed teams.
    TeamChanged {
        /// Roster slot of the moved player.
        short_id: u8,
        /// Team the player is now on.
        team: Team,
    },
    /// Team switching was locked.
    TeamLocked,
    /// Team switching was unlocked.
    TeamUnlocked,
    /// A chat message from another player (local echoes are suppressed).
    Message {
        /// Roster slot of the author.
        author_short_id: u8,
        /// Display name of the author.
        author_name: String,
        /// Message text.
        content: String,
    },
    /// Another player was kicked.
    PlayerKicked {
        /// Roster slot of the kicked player.
        short_id: u8,
        /// Display name of the kicked player.
        username: String,
    },
    /// Another player was banned.
    PlayerBanned {
        /// Roster slot of the banned player.
        short_id: u8,
        /// Display name of the banned player.
        username: String,
    },
    /// The local player was kicked; the session is ending.
    LocalKicked,
    /// The local player was banned; the session is ending.
    LocalBanned,
    /// The room switched modes.
    ModeChanged {
        /// The new mode.
        mode: Mode,
    },
    /// A player's balance adjustment changed.
    PlayerBalanced {
        /// Roster slot of the balanced player.
        short_id: u8,
        /// New adjustment percentage.
        percent: i8,
    },
    /// Extended teams were enabled.
    TeamsEnabled,
    /// Extended teams were disabled.
    TeamsDisabled,
    /// Host authority moved between players.
    HostChanged {
        /// Roster slot of the previous host.
        old_short_id: u8,
        /// Roster slot of the new host.
        new_short_id: u8,
    },
    /// The room was renamed.
    RoomRenamed {
        /// The new room name.
        name: String,
    },
    /// A room password was set by the host.
    RoomPasswordSet,
    /// The room password was removed.
    RoomPasswordCleared,
    /// The session is over: left, closed, kicked, banned or errored.
    SessionEnded,
}
