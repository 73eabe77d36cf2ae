//! Room State
//!
//! The mutable mirror of one session's room: configuration, roster and chat
//! log. Only the dispatch engine (inbound events) and the outgoing-command
//! handlers (optimistic updates) mutate it, always behind the session's
//! lock.

use chrono::{DateTime, Utc};

use crate::core::avatar::Avatar;
use crate::core::types::{Mode, Team};

/// One player in the roster.
///
/// Identity is the session-scoped short id; it never changes across
/// in-place mutation, and the server may reassign it to someone else after
/// this player leaves. Ownership is strictly forward: players do not point
/// back at their room or session.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Session-scoped roster slot id.
    pub short_id: u8,
    /// Opaque transport-level identity, stable for the connection lifetime.
    pub peer_id: String,
    /// Display name.
    pub username: String,
    /// Playing without an account.
    pub guest: bool,
    /// Account level (0 for guests).
    pub level: u32,
    /// Ready to start.
    pub ready: bool,
    /// Tabbed out / away.
    pub tabbed: bool,
    /// Current team assignment.
    pub team: Team,
    /// Balance adjustment percentage, -100..=100.
    pub balance: i8,
    /// Player avatar.
    pub avatar: Avatar,
    /// This roster entry is the session's own player.
    pub is_local: bool,
}

/// One chat message. Immutable once appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Short id of the authoring player at the time of receipt.
    pub author_short_id: u8,
    /// Author name snapshot.
    pub author_name: String,
    /// Message text.
    pub content: String,
    /// When the message was received locally.
    pub received_at: DateTime<Utc>,
}

/// The room mirror.
#[derive(Debug, Clone)]
pub struct RoomState {
    /// Room name.
    pub name: String,
    /// Room password ("" when none).
    pub password: String,
    /// Rounds a player needs to win.
    pub rounds: u16,
    /// Extended (red/blue/green/yellow) teams enabled.
    pub extended_teams: bool,
    /// Free team switching locked.
    pub team_lock: bool,
    /// Current mode.
    pub mode: Mode,
    /// Raw payload of the current map, if one has been observed.
    pub map: Option<String>,
    /// Roster, ordered by arrival.
    pub players: Vec<Player>,
    /// Chronological chat log.
    pub messages: Vec<ChatMessage>,
}

impl RoomState {
    /// Fresh mirror for a new session.
    pub fn new(name: impl Into<String>, password: impl Into<String>, mode: Mode) -> Self {
        RoomState {
            name: name.into(),
            password: password.into(),
            rounds: 3,
            extended_teams: false,
            team_lock: false,
            mode,
            map: None,
            players: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Look up a player by short id.
    pub fn player(&self, short_id: u8) -> Option<&Player> {
        self.players.iter().find(|p| p.short_id == short_id)
    }

    /// Mutable lookup by short id.
    pub fn player_mut(&mut self, short_id: u8) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.short_id == short_id)
    }

    /// The roster entry flagged as the local player, if any.
    pub fn local_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_local)
    }

    /// Insert a player, replacing any existing entry with the same short id
    /// so the roster never holds duplicates.
    pub fn insert_player(&mut self, player: Player) {
        self.players.retain(|p| p.short_id != player.short_id);
        self.players.push(player);
    }

    /// Remove and return the player with the given short id.
    pub fn remove_player(&mut self, short_id: u8) -> Option<Player> {
        let index = self.players.iter().position(|p| p.short_id == short_id)?;
        Some(self.players.remove(index))
    }

    /// Drop the roster and chat log (session teardown).
    pub fn clear(&mut self) {
        self.players.clear();
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(short_id: u8, username: &str) -> Player {
        Player {
            short_id,
            peer_id: format!("peer{short_id}"),
            username: username.to_string(),
            guest: false,
            level: 5,
            ready: false,
            tabbed: false,
            team: Team::FreeForAll,
            balance: 0,
            avatar: Avatar::blank(),
            is_local: false,
        }
    }

    #[test]
    fn test_insert_replaces_same_short_id() {
        let mut room = RoomState::new("room", "", Mode::Classic);
        room.insert_player(player(1, "first"));
        room.insert_player(player(1, "second"));

        assert_eq!(room.players.len(), 1);
        assert_eq!(room.player(1).unwrap().username, "second");
    }

    #[test]
    fn test_remove_player() {
        let mut room = RoomState::new("room", "", Mode::Classic);
        room.insert_player(player(1, "a"));
        room.insert_player(player(2, "b"));

        let removed = room.remove_player(1).unwrap();
        assert_eq!(removed.username, "a");
        assert!(room.player(1).is_none());
        assert_eq!(room.players.len(), 1);
        assert!(room.remove_player(9).is_none());
    }

    #[test]
    fn test_local_player_lookup() {
        let mut room = RoomState::new("room", "", Mode::Classic);
        room.insert_player(player(0, "someone"));
        let mut me = player(1, "me");
        me.is_local = true;
        room.insert_player(me);

        assert_eq!(room.local_player().unwrap().short_id, 1);
    }

    #[test]
    fn test_clear_keeps_configuration() {
        let mut room = RoomState::new("room", "secret", Mode::Grapple);
        room.insert_player(player(0, "a"));
        room.messages.push(ChatMessage {
            author_short_id: 0,
            author_name: "a".into(),
            content: "hi".into(),
            received_at: Utc::now(),
        });

        room.clear();
        assert!(room.players.is_empty());
        assert!(room.messages.is_empty());
        assert_eq!(room.name, "room");
        assert_eq!(room.mode, Mode::Grapple);
    }
}
