//! Room Mirror
//!
//! Local mirror of a session's server-asserted state: the roster, chat log,
//! and room configuration, plus the notification enum subscribers observe.
//! Mutation happens only inside the dispatch engine and the outgoing-command
//! handlers; everything here is plain data.

pub mod events;
pub mod state;

pub use events::SessionEvent;
pub use state::{ChatMessage, Player, RoomState};
